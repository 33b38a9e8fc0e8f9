//! Reusable bundles of variables and constraints (object/class templates,
//! design note 4.6). A `Template` is declared once in problem text; each
//! `instantiate` call produces an independent, renamed copy whose
//! variables do not alias the template's or any other instance's.
use crate::constraint::Constraint;
use crate::context::Context;
use std::collections::HashMap;

/// A named bundle of local variable names and constraints between them,
/// written once and stamped out per instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    local_variables: Vec<String>,
    constraints: Vec<Constraint>,
}

/// An instantiated copy of a `Template`: every local variable has been
/// renamed to `<instance_name>.<local_name>` and every constraint's
/// variable leaves rewritten to match, via the child-index paths
/// `Node::variable_paths` records rather than by capturing a closure over
/// the cloned tree's parent nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    name: String,
    variables: Vec<String>,
    constraints: Vec<Constraint>,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        local_variables: Vec<String>,
        constraints: Vec<Constraint>,
    ) -> Template {
        Template {
            name: name.into(),
            local_variables,
            constraints,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_variables(&self) -> &[String] {
        &self.local_variables
    }

    /// Stamp out an independent `Instance` named `instance_name`. Every
    /// occurrence of a local variable `v` becomes `instance_name.v` in the
    /// copy; variables not declared as local to this template (free
    /// references into the surrounding problem) are left untouched.
    pub fn instantiate(&self, instance_name: impl Into<String>) -> Instance {
        let instance_name = instance_name.into();
        let rename: HashMap<&String, String> = self
            .local_variables
            .iter()
            .map(|local| (local, format!("{}.{}", instance_name, local)))
            .collect();

        let variables = self
            .local_variables
            .iter()
            .map(|local| rename[local].clone())
            .collect();

        let constraints = self
            .constraints
            .iter()
            .map(|constraint| rename_constraint(constraint, &instance_name, &rename))
            .collect();

        Instance {
            name: instance_name,
            variables,
            constraints,
        }
    }
}

fn rename_constraint(
    constraint: &Constraint,
    instance_name: &str,
    rename: &HashMap<&String, String>,
) -> Constraint {
    let mut lhs = constraint.lhs().clone();
    let mut rhs = constraint.rhs().clone();
    for path in lhs.variable_paths() {
        rewire(&mut lhs, &path, rename);
    }
    for path in rhs.variable_paths() {
        rewire(&mut rhs, &path, rename);
    }
    let name = format!("{}.{}", instance_name, constraint.name());
    Constraint::new(name, lhs, rhs)
}

fn rewire(
    root: &mut crate::expression::types::Node,
    (local_name, path): &(String, Vec<usize>),
    rename: &HashMap<&String, String>,
) {
    if let Some(renamed) = rename.get(local_name) {
        root.replace_at(path, crate::expression::types::Node::variable(renamed.clone()));
    }
}

impl Instance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// An empty context scoped to this instance; callers merge it into
    /// the surrounding problem's context with `Context::extended_with`.
    pub fn default_context(&self) -> Context {
        Context::new()
    }
}
