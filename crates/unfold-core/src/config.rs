use serde::{Deserialize, Serialize};

/// Configuration for the optional syntax-shaping rules of the lowering.
///
/// All rules are enabled by default. Disable individual rules by setting
/// their fields to `false`, or use `from_skip_list` with rule name strings.
/// Disabling a rule never changes the meaning of the output, only its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowerConfig {
    /// Turn `x = v;` on a fresh block local into `var x = v;`.
    pub merge_local_initializers: bool,
    /// Drop statement-position fragments without side effects.
    pub elide_pure_statements: bool,
    /// Fold a trailing `v = X; v` pair of a value block into `X`.
    pub forward_trailing_assignment: bool,
    /// Inline `((a) => body)(arg)` into the enclosing code.
    pub inline_closure_invocations: bool,
    /// Spell out lambda parameter types where the type is nameable.
    pub explicit_lambda_parameter_types: bool,
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self {
            merge_local_initializers: true,
            elide_pure_statements: true,
            forward_trailing_assignment: true,
            inline_closure_invocations: true,
            explicit_lambda_parameter_types: true,
        }
    }
}

impl LowerConfig {
    /// Create a config with all rules enabled except those in the skip list.
    ///
    /// Rule names:
    /// - `"merge-local-initializers"`
    /// - `"elide-pure-statements"`
    /// - `"forward-trailing-assignment"`
    /// - `"inline-closure-invocations"`
    /// - `"explicit-lambda-parameter-types"`
    pub fn from_skip_list(skip: &[&str]) -> Self {
        let mut config = Self::default();
        for name in skip {
            match *name {
                "merge-local-initializers" => config.merge_local_initializers = false,
                "elide-pure-statements" => config.elide_pure_statements = false,
                "forward-trailing-assignment" => config.forward_trailing_assignment = false,
                "inline-closure-invocations" => config.inline_closure_invocations = false,
                "explicit-lambda-parameter-types" => config.explicit_lambda_parameter_types = false,
                _ => {}
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_all() {
        let config = LowerConfig::default();
        assert!(config.merge_local_initializers);
        assert!(config.elide_pure_statements);
        assert!(config.forward_trailing_assignment);
        assert!(config.inline_closure_invocations);
        assert!(config.explicit_lambda_parameter_types);
    }

    #[test]
    fn skip_list_disables_rules() {
        let config = LowerConfig::from_skip_list(&["elide-pure-statements"]);
        assert!(config.merge_local_initializers);
        assert!(!config.elide_pure_statements);
        assert!(config.forward_trailing_assignment);
        assert!(config.inline_closure_invocations);
    }

    #[test]
    fn skip_list_all() {
        let config = LowerConfig::from_skip_list(&[
            "merge-local-initializers",
            "elide-pure-statements",
            "forward-trailing-assignment",
            "inline-closure-invocations",
            "explicit-lambda-parameter-types",
        ]);
        assert!(!config.merge_local_initializers);
        assert!(!config.elide_pure_statements);
        assert!(!config.forward_trailing_assignment);
        assert!(!config.inline_closure_invocations);
        assert!(!config.explicit_lambda_parameter_types);
    }

    #[test]
    fn skip_list_unknown_ignored() {
        let config = LowerConfig::from_skip_list(&["nonexistent"]);
        assert_eq!(config, LowerConfig::default());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: LowerConfig = serde_json::from_str(r#"{"elide_pure_statements":false}"#).unwrap();
        assert!(!config.elide_pure_statements);
        assert!(config.merge_local_initializers);
    }
}
