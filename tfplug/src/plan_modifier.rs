use tf_provider::value::Value;
use tf_provider::AttributePath;

#[derive(Debug, Clone)]
pub struct PlanModifyRequest<'a, T> {
    pub state: &'a Value<T>,
    pub plan: Value<T>,
    pub attribute_path: &'a AttributePath,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse<T> {
    pub plan_value: Value<T>,
    pub requires_replace: bool,
}

/// Trait for modifying terraform plan behavior
///
/// Plan modifiers run after Terraform has generated a plan and can:
/// - Modify the planned value
/// - Mark an attribute as requiring replacement
pub trait PlanModifier<T>: Send + Sync {
    /// Modify the plan for an attribute
    fn modify_plan(&self, request: PlanModifyRequest<'_, T>) -> PlanModifyResponse<T>;
}

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplaceIfChanged;

impl<T: PartialEq> PlanModifier<T> for RequiresReplaceIfChanged {
    fn modify_plan(&self, request: PlanModifyRequest<'_, T>) -> PlanModifyResponse<T> {
        let requires_replace = !matches!(
            (request.state, &request.plan),
            (Value::Null, Value::Null) | (Value::Unknown, _) | (_, Value::Unknown)
        ) && request.state != &request.plan;

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
        }
    }
}

/// A plan modifier that uses the current state value when the planned value is unknown
///
/// Computed attributes such as server-assigned IDs keep their value during planning
/// instead of showing up as "known after apply" on every update.
pub struct UseStateForUnknown;

impl<T: Clone> PlanModifier<T> for UseStateForUnknown {
    fn modify_plan(&self, request: PlanModifyRequest<'_, T>) -> PlanModifyResponse<T> {
        let plan_value = match (&request.plan, request.state) {
            (Value::Unknown, Value::Value(_)) => request.state.clone(),
            _ => request.plan,
        };

        PlanModifyResponse {
            plan_value,
            requires_replace: false,
        }
    }
}

pub struct RequiresReplaceIf<F> {
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F> {
    pub fn new(predicate: F, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }
}

impl<T, F> PlanModifier<T> for RequiresReplaceIf<F>
where
    F: Fn(&Value<T>, &Value<T>) -> bool + Send + Sync,
{
    fn modify_plan(&self, request: PlanModifyRequest<'_, T>) -> PlanModifyResponse<T> {
        let requires_replace = (self.predicate)(request.state, &request.plan);

        if requires_replace {
            tracing::debug!(
                "Attribute '{}' requires resource replacement: {}",
                request.attribute_path,
                self.description
            );
        }

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
        }
    }
}

/// Applies modifiers to a planned attribute in order, recording its path in
/// `replace` if any modifier demands replacement.
pub fn modify_attribute<T>(
    state: &Value<T>,
    plan: &mut Value<T>,
    path: AttributePath,
    modifiers: &[&dyn PlanModifier<T>],
    replace: &mut Vec<AttributePath>,
) {
    let mut requires_replace = false;
    for modifier in modifiers {
        let response = modifier.modify_plan(PlanModifyRequest {
            state,
            plan: std::mem::replace(plan, Value::Null),
            attribute_path: &path,
        });
        *plan = response.plan_value;
        requires_replace |= response.requires_replace;
    }

    if requires_replace && !replace.contains(&path) {
        replace.push(path);
    }
}

/// Shorthand for the common "replace when changed" case
pub fn requires_replace<T: PartialEq + Clone>(
    state: &Value<T>,
    plan: &Value<T>,
    path: AttributePath,
    replace: &mut Vec<AttributePath>,
) {
    let mut plan = plan.clone();
    modify_attribute(state, &mut plan, path, &[&RequiresReplaceIfChanged], replace);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> AttributePath {
        AttributePath::new("name")
    }

    #[test]
    fn requires_replace_if_changed_detects_change() {
        let state = Value::Value("a".to_string());
        let response = RequiresReplaceIfChanged.modify_plan(PlanModifyRequest {
            state: &state,
            plan: Value::Value("b".to_string()),
            attribute_path: &path(),
        });
        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_unknown_and_nulls() {
        let state: Value<String> = Value::Null;
        let response = RequiresReplaceIfChanged.modify_plan(PlanModifyRequest {
            state: &state,
            plan: Value::Null,
            attribute_path: &path(),
        });
        assert!(!response.requires_replace);

        let state = Value::Value("a".to_string());
        let response = RequiresReplaceIfChanged.modify_plan(PlanModifyRequest {
            state: &state,
            plan: Value::Unknown,
            attribute_path: &path(),
        });
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_keeps_prior_value() {
        let state = Value::Value("id-1".to_string());
        let response = UseStateForUnknown.modify_plan(PlanModifyRequest {
            state: &state,
            plan: Value::Unknown,
            attribute_path: &path(),
        });
        assert_eq!(response.plan_value, Value::Value("id-1".to_string()));

        let state: Value<String> = Value::Null;
        let response = UseStateForUnknown.modify_plan(PlanModifyRequest {
            state: &state,
            plan: Value::Unknown,
            attribute_path: &path(),
        });
        assert_eq!(response.plan_value, Value::Unknown);
    }

    #[test]
    fn requires_replace_if_uses_predicate() {
        let shrink_only = RequiresReplaceIf::new(
            |state: &Value<i64>, plan: &Value<i64>| match (state, plan) {
                (Value::Value(a), Value::Value(b)) => b < a,
                _ => false,
            },
            "size can only grow",
        );

        let mut replace = Vec::new();
        let mut plan: Value<i64> = Value::Value(10);
        modify_attribute(&Value::Value(20i64), &mut plan, path(), &[&shrink_only], &mut replace);
        assert_eq!(replace.len(), 1);

        let mut replace = Vec::new();
        let mut plan: Value<i64> = Value::Value(30);
        modify_attribute(&Value::Value(20i64), &mut plan, path(), &[&shrink_only], &mut replace);
        assert!(replace.is_empty());
    }

    #[test]
    fn modify_attribute_chains_modifiers_and_dedups_paths() {
        let mut replace = vec![path()];
        let mut plan: Value<String> = Value::Unknown;
        modify_attribute(
            &Value::Value("x".to_string()),
            &mut plan,
            path(),
            &[&UseStateForUnknown, &RequiresReplaceIfChanged],
            &mut replace,
        );
        assert_eq!(plan, Value::Value("x".to_string()));
        assert_eq!(replace.len(), 1);
    }

    #[test]
    fn requires_replace_helper_records_path_once() {
        let mut replace = Vec::new();
        requires_replace(
            &Value::Value("MCS".to_string()),
            &Value::Value("Manual".to_string()),
            AttributePath::new("provisioning_type"),
            &mut replace,
        );
        requires_replace(
            &Value::Value("MCS".to_string()),
            &Value::Value("Manual".to_string()),
            AttributePath::new("provisioning_type"),
            &mut replace,
        );
        assert_eq!(replace, vec![AttributePath::new("provisioning_type")]);
    }
}
