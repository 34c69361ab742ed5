//! Scope Materializer - the arguments a predecessor exposes to the target
//!
//! Exposure rules by node type:
//! - `Start`: input args (bindings cleared), output args, then system variables
//! - `Loop` seen from inside its body: `<input>_item` per array input, `INDEX`, loop variables
//! - `Loop` seen from outside: declared outputs only
//! - `Variable` in `SET_VARIABLE` mode: outputs plus `isSuccess`
//! - anything else: declared outputs verbatim

use crate::arg::{ArgDef, DataType};
use crate::arg_map::ArgMap;
use crate::node::{Node, NodeType, VariableConfigType};
use std::collections::HashSet;

pub const SYSTEM_USER_ID: &str = "SYS_USER_ID";
pub const INDEX_VARIABLE: &str = "INDEX";
pub const ITEM_SUFFIX: &str = "_item";
pub const SUCCESS_OUTPUT: &str = "isSuccess";

/// System variables every Start node exposes
pub fn builtin_system_variables() -> Vec<ArgDef> {
    vec![ArgDef::system(SYSTEM_USER_ID, DataType::string(), "System user ID")]
}

/// Computes exposed arguments for one resolution.
pub(crate) struct Materializer {
    system_variables: Vec<ArgDef>,
}

impl Materializer {
    /// `system_variables` follow the built-in ones; later duplicates of a name are dropped
    pub fn new(system_variables: impl IntoIterator<Item = ArgDef>) -> Self {
        let mut seen = HashSet::new();
        let system_variables = builtin_system_variables()
            .into_iter()
            .chain(system_variables)
            .filter(|arg| seen.insert(arg.name.clone()))
            .collect();
        Self { system_variables }
    }

    /// Arguments `node` exposes. `inside_loop` is set when the target sits in the
    /// body of `node`. References are resolved against `arg_map`, the entries of
    /// everything materialized before this node.
    pub fn exposed_args(&self, node: &Node, inside_loop: bool, arg_map: &ArgMap) -> Vec<ArgDef> {
        match node.node_type {
            NodeType::Start => self.start_args(node),
            NodeType::Loop if inside_loop => loop_iteration_args(node, arg_map),
            NodeType::Variable if node.config().config_type == Some(VariableConfigType::SetVariable) => {
                set_variable_outputs(node)
            }
            _ => node.config().output_args.clone(),
        }
    }

    fn start_args(&self, node: &Node) -> Vec<ArgDef> {
        let cfg = node.config();
        let mut args: Vec<ArgDef> = cfg.input_args.iter().map(ArgDef::unbound).collect();
        args.extend(cfg.output_args.iter().cloned());

        let declared: HashSet<&str> = args.iter().map(|a| a.name.as_str()).collect();
        let system: Vec<ArgDef> = self
            .system_variables
            .iter()
            .filter(|v| !declared.contains(v.name.as_str()))
            .cloned()
            .collect();
        args.extend(system);
        args
    }
}

fn loop_iteration_args(node: &Node, arg_map: &ArgMap) -> Vec<ArgDef> {
    let cfg = node.config();
    let mut args = Vec::new();

    for input in &cfg.input_args {
        let source = input.reference().and_then(|token| arg_map.resolve(token));
        let (data_type, sub_args) = match source {
            Some(referenced) => (referenced.data_type.as_ref(), &referenced.sub_args),
            None => (input.data_type.as_ref(), &input.sub_args),
        };
        let Some(element) = data_type.and_then(DataType::element_type) else {
            continue;
        };

        let mut item = input.unbound();
        item.name = format!("{}{}", input.name, ITEM_SUFFIX);
        item.data_type = Some(element.clone());
        item.sub_args = match element {
            DataType::Object => sub_args.clone(),
            _ => Vec::new(),
        };
        args.push(item);
    }

    args.push(ArgDef::system(INDEX_VARIABLE, DataType::integer(), "Array index"));
    args.extend(loop_variables(node, arg_map));
    args
}

/// Loop variables, unbound. A Reference binding copies the source's fields,
/// and its type when the variable declares none.
pub(crate) fn loop_variables(node: &Node, arg_map: &ArgMap) -> Vec<ArgDef> {
    node.config()
        .variable_args
        .iter()
        .map(|variable| {
            let mut exposed = variable.unbound();
            if let Some(referenced) = variable.reference().and_then(|token| arg_map.resolve(token)) {
                exposed.sub_args = referenced.sub_args.clone();
                if exposed.data_type.is_none() {
                    exposed.data_type = referenced.data_type.clone();
                }
            }
            exposed
        })
        .collect()
}

fn set_variable_outputs(node: &Node) -> Vec<ArgDef> {
    let mut outputs = node.config().output_args.clone();
    if !outputs.iter().any(|o| o.name == SUCCESS_OUTPUT) {
        outputs.push(
            ArgDef::new(SUCCESS_OUTPUT, DataType::boolean()).with_description("Variable set result"),
        );
    }
    outputs
}

/// Rewrite a loop body output as the Loop's per-iteration aggregate.
///
/// Scalars and objects become arrays of themselves; arrays become arrays of
/// objects. The original type is kept in `origin_data_type`.
pub fn aggregate(arg: &ArgDef) -> ArgDef {
    let mut out = arg.clone();
    out.origin_data_type = arg.data_type.clone();
    out.data_type = Some(match &arg.data_type {
        Some(DataType::Array(_)) => DataType::array_of(DataType::Object),
        Some(other) => DataType::array_of(other.clone()),
        None => DataType::array_of(DataType::Object),
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn plain() -> Materializer {
        Materializer::new(Vec::<ArgDef>::new())
    }

    fn names(args: &[ArgDef]) -> Vec<&str> {
        args.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_start_always_has_system_variables() {
        let m = plain();
        let args = m.exposed_args(&start("1"), false, &ArgMap::new());
        assert!(!args.is_empty());
        assert!(args.iter().all(|a| a.name.starts_with("SYS_") && a.system_variable));
    }

    #[test]
    fn test_start_inputs_then_outputs_then_system() {
        let node = start("1")
            .with_input_args(vec![ArgDef::new("question", DataType::string()).with_literal("hi")])
            .with_output_args(vec![ArgDef::new("files", DataType::parse("Array_File").unwrap())]);
        let m = Materializer::new([
            ArgDef::system("SYS_TENANT", DataType::string(), "Tenant"),
            ArgDef::system(SYSTEM_USER_ID, DataType::integer(), "Shadowed"),
        ]);
        let args = m.exposed_args(&node, false, &ArgMap::new());

        assert_eq!(names(&args), vec!["question", "files", SYSTEM_USER_ID, "SYS_TENANT"]);
        assert!(args[0].bind_value.is_none());
        assert_eq!(args[2].data_type, Some(DataType::string()));
    }

    #[test]
    fn test_loop_inside_and_outside() {
        let graph = loop_graph();
        let mut map = ArgMap::new();
        map.insert_node(&"1".into(), &graph.nodes[0].node_config.output_args);
        let looped = &graph.nodes[1];
        let m = plain();

        let inside = m.exposed_args(looped, true, &map);
        assert_eq!(names(&inside), vec!["arr_item", INDEX_VARIABLE]);
        assert_eq!(inside[0].data_type, Some(DataType::Object));
        assert_eq!(inside[0].sub_args[0].name, "field");
        assert_eq!(inside[1].data_type, Some(DataType::integer()));

        let outside = m.exposed_args(looped, false, &map);
        assert_eq!(names(&outside), vec!["results"]);
    }

    #[test]
    fn test_loop_scalar_array_and_own_type() {
        let mut looped = node("5", NodeType::Loop).with_input_args(vec![
            ArgDef::new("names", DataType::array_of(DataType::string())),
            ArgDef::new("limit", DataType::integer()),
        ]);
        looped.node_config.variable_args = vec![ArgDef::new("acc", DataType::string())];
        let args = plain().exposed_args(&looped, true, &ArgMap::new());

        assert_eq!(names(&args), vec!["names_item", INDEX_VARIABLE, "acc"]);
        assert_eq!(args[0].data_type, Some(DataType::string()));
        assert!(args[0].sub_args.is_empty());
    }

    #[test]
    fn test_loop_variable_copies_referenced_sub_args() {
        let mut map = ArgMap::new();
        let profile = ArgDef::new("profile", DataType::Object)
            .with_sub_args(vec![ArgDef::new("age", DataType::integer())]);
        map.insert_node(&"1".into(), &[profile]);

        let mut looped = node("5", NodeType::Loop);
        looped.node_config.variable_args =
            vec![ArgDef::new("current", DataType::Object).bound_to("1.profile")];
        let args = plain().exposed_args(&looped, true, &map);

        let current = args.iter().find(|a| a.name == "current").unwrap();
        assert_eq!(current.sub_args[0].name, "age");
        assert!(current.reference().is_none());
    }

    #[test]
    fn test_set_variable_adds_success_flag() {
        let mut setter = node("4", NodeType::Variable)
            .with_output_args(vec![ArgDef::new("value", DataType::string())]);
        setter.node_config.config_type = Some(VariableConfigType::SetVariable);
        let m = plain();

        let args = m.exposed_args(&setter, false, &ArgMap::new());
        assert_eq!(names(&args), vec!["value", SUCCESS_OUTPUT]);
        assert_eq!(args[1].data_type, Some(DataType::boolean()));

        setter.node_config.output_args.push(ArgDef::new(SUCCESS_OUTPUT, DataType::boolean()));
        assert_eq!(m.exposed_args(&setter, false, &ArgMap::new()).len(), 2);

        setter.node_config.config_type = Some(VariableConfigType::GetVariable);
        setter.node_config.output_args.pop();
        assert_eq!(names(&m.exposed_args(&setter, false, &ArgMap::new())), vec!["value"]);
    }

    #[test]
    fn test_other_nodes_keep_nested_outputs() {
        let out = ArgDef::new("doc", DataType::Object)
            .with_sub_args(vec![ArgDef::new("title", DataType::string())]);
        let code = node("3", NodeType::Code).with_output_args(vec![out.clone()]);
        let args = plain().exposed_args(&code, false, &ArgMap::new());
        assert_eq!(args, vec![out]);

        let empty = node("4", NodeType::End);
        assert!(plain().exposed_args(&empty, false, &ArgMap::new()).is_empty());
    }

    #[test]
    fn test_aggregate_types() {
        let scalar = aggregate(&ArgDef::new("score", DataType::integer()));
        assert_eq!(scalar.data_type, Some(DataType::array_of(DataType::integer())));
        assert_eq!(scalar.origin_data_type, Some(DataType::integer()));

        let array = aggregate(&ArgDef::new("tags", DataType::array_of(DataType::string())));
        assert_eq!(array.data_type, Some(DataType::array_of(DataType::Object)));
        assert_eq!(array.origin_data_type, Some(DataType::array_of(DataType::string())));

        let untyped = aggregate(&ArgDef::default());
        assert_eq!(untyped.data_type, Some(DataType::array_of(DataType::Object)));
        assert!(untyped.origin_data_type.is_none());
    }
}
