use serde_json::{json, Value};

use crate::agents::AgentProfile;
use crate::error::ToolFailure;
use crate::schema::FieldSchema;
use crate::tools::{tool_fn, DynSimTool, ToolCatalog, ToolDescriptor};

fn number(arguments: &Value, name: &str) -> Result<f64, ToolFailure> {
    arguments
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolFailure::invalid_arguments(format!("'{name}' must be a number")))
}

pub fn add_tool() -> DynSimTool {
    let descriptor = ToolDescriptor::new(
        "add",
        FieldSchema::object()
            .with_required_property("a", FieldSchema::integer().with_description("First addend."))
            .with_required_property("b", FieldSchema::integer().with_description("Second addend.")),
    )
    .with_description("Adds two numbers.");

    tool_fn(descriptor, |arguments| async move {
        let a = arguments
            .get("a")
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolFailure::invalid_arguments("'a' must be an integer"))?;
        let b = arguments
            .get("b")
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolFailure::invalid_arguments("'b' must be an integer"))?;
        Ok(json!(a + b))
    })
}

pub fn divide_tool() -> DynSimTool {
    let descriptor = ToolDescriptor::new(
        "divide",
        FieldSchema::object()
            .with_required_property(
                "dividend",
                FieldSchema::number().with_description("Number to divide."),
            )
            .with_required_property(
                "divisor",
                FieldSchema::number().with_description("Number to divide by."),
            ),
    )
    .with_description("Divides one number by another.");

    tool_fn(descriptor, |arguments| async move {
        let dividend = number(&arguments, "dividend")?;
        let divisor = number(&arguments, "divisor")?;
        if divisor == 0.0 {
            return Err(ToolFailure::raised("ZeroDivisionError", "division by zero"));
        }
        Ok(json!(dividend / divisor))
    })
}

pub fn register_math_tools(catalog: &mut ToolCatalog) {
    catalog.register(add_tool());
    catalog.register(divide_tool());
}

/// The built-in calculator agent used by the replay binary and tests.
pub fn demo_agent() -> AgentProfile {
    let mut catalog = ToolCatalog::new();
    register_math_tools(&mut catalog);

    AgentProfile::new(
        "calculator_agent",
        "You are an expert mathematician.\n\n\
         Use the available tools to perform requested calculations accurately and efficiently.",
    )
    .with_description("A helpful assistant for performing mathematical calculations.")
    .with_tool_catalog(catalog)
}
