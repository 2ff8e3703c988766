use svgvalue_shared::byte_stream::Location;

/// ParserConfig holds the configuration for the grammar parser
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// Optional name of the grammar (property name, file name), used in log output
    pub source: Option<String>,
    /// Location holds the start position of the grammar in its source. Error locations are
    /// reported relative to it.
    pub location: Location,
}

/// MatcherConfig holds the configuration for a single match
#[derive(Debug, Clone, Copy, Default)]
pub struct MatcherConfig {
    /// Check numeric values against the bracketed range of their basic type, and require
    /// `<integer>` values to be integral
    pub enforce_ranges: bool,
    /// A match that leaves tokens unconsumed is reported as no match
    pub require_full_input: bool,
    /// Maximum number of term match attempts before the match is given up
    pub max_steps: Option<usize>,
}
