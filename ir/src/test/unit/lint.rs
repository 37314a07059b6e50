use crate::test::helpers::quantized_module_chain;
use crate::{Error, Graph};

#[test]
fn test_valid_chain_passes() {
    let c = quantized_module_chain();
    c.gm.graph.lint().unwrap();
    c.gm.lint().unwrap();
}

#[test]
fn test_missing_output() {
    let mut g = Graph::new();
    g.placeholder("x").unwrap();

    assert_eq!(g.lint(), Err(Error::MissingOutput));
}

#[test]
fn test_dead_node() {
    let mut c = quantized_module_chain();
    c.gm.graph.get_attr("unused_scale").unwrap();

    assert_eq!(c.gm.graph.lint(), Err(Error::DeadNode { node: "unused_scale".into() }));
}

#[test]
fn test_unused_input_is_not_dead() {
    let mut g = Graph::new();
    let x = g.placeholder("x").unwrap();
    g.placeholder("unused").unwrap();
    g.output(x).unwrap();

    g.lint().unwrap();
}

#[test]
fn test_users_out_of_sync() {
    let mut c = quantized_module_chain();
    c.gm.graph.get_mut(c.x).unwrap().users.clear();

    assert_eq!(
        c.gm.graph.lint(),
        Err(Error::UsersOutOfSync { node: "x".into(), recorded: vec![], actual: vec!["dequantize".into()] })
    );
}

#[test]
fn test_operand_after_user() {
    let mut c = quantized_module_chain();
    // Point the dequantize at a node defined later.
    c.gm.graph.get_mut(c.dq).unwrap().args[0] = c.q.into();

    assert_eq!(
        c.gm.graph.lint(),
        Err(Error::OperandAfterUser { node: "dequantize".into(), operand: "quantize_per_tensor".into() })
    );
}

#[test]
fn test_dangling_operand() {
    let mut c = quantized_module_chain();
    c.gm.graph.replace_all_uses_with(c.dq, c.x).unwrap();
    c.gm.graph.erase_node(c.dq).unwrap();
    c.gm.graph.get_mut(c.call).unwrap().args[0] = c.dq.into();

    assert_eq!(c.gm.graph.lint(), Err(Error::DanglingOperand { node: "linear".into(), operand: c.dq }));
}

#[test]
fn test_unknown_module_target() {
    let mut c = quantized_module_chain();
    c.gm.modules = Default::default();

    assert_eq!(c.gm.lint(), Err(Error::UnknownModule { path: "linear".into() }));
}

#[test]
fn test_unknown_attribute_target() {
    let mut c = quantized_module_chain();
    c.gm.params.remove(&"linear_scale_0".into());

    assert_eq!(c.gm.lint(), Err(Error::UnknownAttribute { path: "linear_scale_0".into() }));
}
