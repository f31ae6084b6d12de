//! PowerShell command rendering for the StoreFront SDK

/// Single-quoted PowerShell literal; embedded quotes are doubled
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerShellCommand {
    cmdlet: String,
    params: Vec<String>,
    pipeline: Vec<String>,
    to_json: bool,
}

impl PowerShellCommand {
    pub fn new(cmdlet: &str) -> Self {
        Self {
            cmdlet: cmdlet.to_string(),
            params: Vec::new(),
            pipeline: Vec::new(),
            to_json: false,
        }
    }

    /// `-Name 'value'`
    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.push(format!("-{} {}", name, quote(value)));
        self
    }

    pub fn param_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    /// `-Name`
    pub fn switch(mut self, name: &str) -> Self {
        self.params.push(format!("-{}", name));
        self
    }

    /// `-Name:$true` / `-Name:$false`
    pub fn bool_param(mut self, name: &str, value: bool) -> Self {
        self.params
            .push(format!("-{}:${}", name, if value { "true" } else { "false" }));
        self
    }

    pub fn int_param(mut self, name: &str, value: i64) -> Self {
        self.params.push(format!("-{} {}", name, value));
        self
    }

    /// `-Name @('a','b')`
    pub fn list_param(mut self, name: &str, values: &[String]) -> Self {
        let items = values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(",");
        self.params.push(format!("-{} @({})", name, items));
        self
    }

    /// Parameter whose value is already valid PowerShell, usually a `(Get-...)` sub-expression
    pub fn raw_param(mut self, name: &str, expression: &str) -> Self {
        self.params.push(format!("-{} {}", name, expression));
        self
    }

    /// Disables the confirmation prompt
    pub fn no_confirm(self) -> Self {
        self.bool_param("Confirm", false)
    }

    /// Appends a pipeline stage such as `Select-Object ...`
    pub fn pipe(mut self, stage: &str) -> Self {
        self.pipeline.push(stage.to_string());
        self
    }

    /// Pipes the result through `ConvertTo-Json`
    pub fn pipe_to_json(mut self) -> Self {
        self.to_json = true;
        self
    }

    pub fn render(&self) -> String {
        let mut out = self.cmdlet.clone();
        for param in &self.params {
            out.push(' ');
            out.push_str(param);
        }
        for stage in &self.pipeline {
            out.push_str(" | ");
            out.push_str(stage);
        }
        if self.to_json {
            out.push_str(" | ConvertTo-Json -Depth 4 -Compress");
        }
        out
    }

    /// Rendered form wrapped in parentheses for use as another command's argument
    pub fn as_subexpression(&self) -> String {
        format!("({})", self.render())
    }
}

impl std::fmt::Display for PowerShellCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// `(Get-STFStoreService -SiteId '1' -VirtualPath '/Citrix/Store')`
pub fn store_service_expression(site_id: &str, virtual_path: &str) -> String {
    PowerShellCommand::new("Get-STFStoreService")
        .param("SiteId", site_id)
        .param("VirtualPath", virtual_path)
        .as_subexpression()
}
