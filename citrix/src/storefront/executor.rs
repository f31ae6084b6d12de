//! Runs rendered PowerShell locally or on a remote StoreFront server

use async_trait::async_trait;
use tokio::process::Command;

use super::command::quote;
use super::error::StoreFrontError;

const POWERSHELL: &str = "powershell.exe";
const PASSWORD_ENV: &str = "CITRIX_STF_REMOTE_PASSWORD";
const PRELUDE: &str = "$ErrorActionPreference = 'Stop'; Import-Module Citrix.StoreFront";

#[async_trait]
pub trait PowerShellExecutor: Send + Sync {
    /// Runs `script` and returns its standard output
    async fn run(&self, script: &str) -> Result<String, StoreFrontError>;
}

/// StoreFront server reached through PowerShell remoting
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteHost {
    pub computer_name: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RemoteHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHost")
            .field("computer_name", &self.computer_name)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    remote: Option<RemoteHost>,
}

impl ProcessExecutor {
    pub fn new(remote: Option<RemoteHost>) -> Self {
        Self { remote }
    }

    /// Full script handed to `powershell.exe -Command`
    pub fn wrap(&self, script: &str) -> String {
        match &self.remote {
            None => format!("{}; {}", PRELUDE, script),
            // The password travels in the child environment, never on the command line
            Some(remote) => format!(
                "$ErrorActionPreference = 'Stop'; \
                 $secret = ConvertTo-SecureString $env:{} -AsPlainText -Force; \
                 $credential = New-Object System.Management.Automation.PSCredential({}, $secret); \
                 Invoke-Command -ComputerName {} -Credential $credential -ScriptBlock {{ {}; {} }}",
                PASSWORD_ENV,
                quote(&remote.username),
                quote(&remote.computer_name),
                PRELUDE,
                script
            ),
        }
    }
}

#[async_trait]
impl PowerShellExecutor for ProcessExecutor {
    async fn run(&self, script: &str) -> Result<String, StoreFrontError> {
        tracing::debug!("Running PowerShell: {}", script);

        let mut command = Command::new(POWERSHELL);
        command
            .arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-Command")
            .arg(self.wrap(script))
            .kill_on_drop(true);
        if let Some(remote) = &self.remote {
            command.env(PASSWORD_ENV, &remote.password);
        }

        let output = command.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!("PowerShell exited with {}: {}", output.status, stderr);
            return Err(StoreFrontError::CommandFailed {
                stderr: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        tracing::debug!("PowerShell output: {}", stdout);
        Ok(stdout)
    }
}

/// Records every script and answers from a queue of canned outputs
#[cfg(test)]
#[derive(Default)]
pub struct MockExecutor {
    scripts: std::sync::Mutex<Vec<String>>,
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String, StoreFrontError>>>,
}

#[cfg(test)]
impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, output: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(output.to_string()));
        self
    }

    pub fn fail(self, stderr: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(StoreFrontError::CommandFailed {
                stderr: stderr.to_string(),
            }));
        self
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl PowerShellExecutor for MockExecutor {
    async fn run(&self, script: &str) -> Result<String, StoreFrontError> {
        self.scripts.lock().unwrap().push(script.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_script_has_prelude() {
        let executor = ProcessExecutor::new(None);
        assert_eq!(
            executor.wrap("Get-STFDeployment"),
            "$ErrorActionPreference = 'Stop'; Import-Module Citrix.StoreFront; Get-STFDeployment"
        );
    }

    #[test]
    fn test_remote_script_uses_invoke_command() {
        let executor = ProcessExecutor::new(Some(RemoteHost {
            computer_name: "stf01".to_string(),
            username: r"CORP\admin".to_string(),
            password: "p@ss'word".to_string(),
        }));
        let script = executor.wrap("Get-STFDeployment");

        assert!(script.contains("Invoke-Command -ComputerName 'stf01'"));
        assert!(script.contains(r"PSCredential('CORP\admin', $secret)"));
        assert!(script.contains("-ScriptBlock { $ErrorActionPreference = 'Stop'; Import-Module Citrix.StoreFront; Get-STFDeployment }"));
        assert!(!script.contains("p@ss"));
    }

    #[test]
    fn test_remote_host_debug_hides_password() {
        let host = RemoteHost {
            computer_name: "stf01".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", host).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_mock_executor_records_and_replays() {
        let mock = MockExecutor::new().respond("{}").fail("boom");

        assert_eq!(mock.run("a").await.unwrap(), "{}");
        assert!(matches!(
            mock.run("b").await,
            Err(StoreFrontError::CommandFailed { .. })
        ));
        assert_eq!(mock.run("c").await.unwrap(), "");
        assert_eq!(mock.scripts(), vec!["a", "b", "c"]);
    }
}
