use crate::config::ParserConfig;
use crate::parser::{parse_grammar, GrammarParser};
use crate::terms::{BasicType, Term};
use std::collections::HashMap;
use svgvalue_shared::byte_stream::ByteStream;
use svgvalue_shared::errors::{GrammarError, GrammarResult};

/// A function that can be used wherever a value of its return type is expected, like
/// `rgba(...)` for `<color>`
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Parameters, matched in order. Commas between parameters are optional.
    pub params: Vec<Term>,
    pub return_type: BasicType,
}

impl Function {
    pub fn new(params: Vec<Term>, return_type: BasicType) -> Self {
        Self { params, return_type }
    }
}

/// Named grammars that terms can refer to during matching. Names that are not found simply
/// do not match.
#[derive(Debug, Clone, Default)]
pub struct Context {
    properties: HashMap<String, Term>,
    non_terminals: HashMap<String, Term>,
    functions: HashMap<String, Function>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the grammar of a property, referred to as `<'name'>`
    pub fn add_property(&mut self, name: &str, term: Term) {
        self.properties.insert(name.to_string(), term);
    }

    /// Adds a non-terminal, referred to as `<name>`
    pub fn add_non_terminal(&mut self, name: &str, term: Term) {
        self.non_terminals.insert(name.to_string(), term);
    }

    pub fn add_function(&mut self, name: &str, function: Function) {
        self.functions.insert(name.to_string(), function);
    }

    /// Compiles and adds the grammar of a property
    pub fn define_property(&mut self, name: &str, grammar: &str) -> GrammarResult<()> {
        let term = compile(name, grammar)?;
        self.add_property(name, term);
        Ok(())
    }

    /// Compiles and adds a non-terminal
    pub fn define_non_terminal(&mut self, name: &str, grammar: &str) -> GrammarResult<()> {
        let term = compile(name, grammar)?;
        self.add_non_terminal(name, term);
        Ok(())
    }

    /// Compiles and adds a function. The return type must be a basic type, like `<color>`.
    pub fn define_function(&mut self, name: &str, params: &[&str], return_type: &str) -> GrammarResult<()> {
        let Term::BasicType(return_type) = parse_grammar(return_type)? else {
            return Err(GrammarError::new("expected a basic type"));
        };

        let params = params
            .iter()
            .map(|param| compile(name, param))
            .collect::<GrammarResult<Vec<_>>>()?;

        self.add_function(name, Function::new(params, return_type));
        Ok(())
    }

    pub fn property(&self, name: &str) -> Option<&Term> {
        self.properties.get(name)
    }

    pub fn non_terminal(&self, name: &str) -> Option<&Term> {
        self.non_terminals.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }
}

fn compile(name: &str, grammar: &str) -> GrammarResult<Term> {
    let stream = ByteStream::new_from_str(grammar);
    let config = ParserConfig {
        source: Some(name.to_string()),
        ..ParserConfig::default()
    };

    GrammarParser::new(&stream, config).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::BasicTypeName;

    #[test]
    fn define_and_lookup() {
        let mut ctx = Context::new();
        ctx.define_non_terminal("family-name", "<string> | <custom-ident>").unwrap();
        ctx.define_property("width", "auto | <length>").unwrap();

        assert_eq!(
            ctx.non_terminal("family-name"),
            Some(&Term::OneOf(vec![
                Term::basic(BasicTypeName::String),
                Term::basic(BasicTypeName::CustomIdent),
            ]))
        );
        assert!(ctx.property("width").is_some());
        assert!(ctx.property("family-name").is_none());
        assert!(ctx.non_terminal("width").is_none());
    }

    #[test]
    fn define_function() {
        let mut ctx = Context::new();
        ctx.define_function("rgb", &["<number>", "<number>", "<number>"], "<color>")
            .unwrap();

        let rgb = ctx.function("rgb").unwrap();
        assert_eq!(rgb.params.len(), 3);
        assert_eq!(rgb.return_type, BasicType::new(BasicTypeName::Color));

        let err = ctx.define_function("bad", &[], "<family-name>").unwrap_err();
        assert_eq!(err.message, "expected a basic type");
    }

    #[test]
    fn invalid_grammar_is_not_added() {
        let mut ctx = Context::new();

        assert!(ctx.define_property("width", "[ auto").is_err());
        assert!(ctx.property("width").is_none());
    }
}
