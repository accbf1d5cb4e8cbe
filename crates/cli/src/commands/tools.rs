//! `conductor tools`: List the built-in tools.

use conductor_config::AppConfig;
use conductor_core::tool::ToolDefinition;
use conductor_tools::KeywordIndex;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = super::build_registry(config, KeywordIndex::new())?;

    println!("Built-in tools ({}):", registry.len());
    for definition in registry.list() {
        println!();
        print!("{}", describe(definition));
    }
    if config.tools.github_token.is_none() {
        println!();
        println!("  (code_search is disabled: set GITHUB_TOKEN or tools.github_token)");
    }
    Ok(())
}

fn describe(definition: &ToolDefinition) -> String {
    let mut out = format!("  {}\n    {}\n", definition.name, definition.description);
    for param in &definition.parameters {
        let mut line = format!(
            "      {} ({}, {})",
            param.name,
            param.param_type,
            if param.required { "required" } else { "optional" }
        );
        if let Some(default) = &param.default {
            line.push_str(&format!(" = {default}"));
        }
        if !param.description.is_empty() {
            line.push_str(&format!(": {}", param.description));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::tool::{ParamType, ParameterSpec};
    use serde_json::json;

    #[test]
    fn describes_parameters() {
        let definition = ToolDefinition::new("search", "Search things")
            .param(ParameterSpec::required("query", ParamType::String).with_description("What to find"))
            .param(ParameterSpec::optional("limit", ParamType::Integer).with_default(json!(5)));

        let text = describe(&definition);
        assert!(text.contains("search\n    Search things"));
        assert!(text.contains("query (string, required): What to find"));
        assert!(text.contains("limit (integer, optional) = 5"));
    }
}
