//! Naming policies for meaningless variables
//!
//! Decompiled and obfuscated code is full of locals called `a`, `var3` or
//! `lIl1`. A [`NamingPolicy`] may propose a readable replacement for such a
//! parameter or local; names from the symbol store always take precedence.

use crate::symbol::Symbol;
use regex::Regex;
use std::sync::OnceLock;

/// Reserved words and literals that can never be used as identifiers
pub const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long", "native",
    "new", "package", "private", "protected", "public", "return", "short", "static", "strictfp",
    "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try", "void",
    "volatile", "while", "true", "false", "null", "_",
];

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
static MEANINGLESS: OnceLock<Regex> = OnceLock::new();

pub fn is_keyword(name: &str) -> bool {
    JAVA_KEYWORDS.contains(&name)
}

/// Whether `name` can be emitted as a Java identifier
pub fn is_valid_identifier(name: &str) -> bool {
    let re = IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[\p{L}_$][\p{L}\p{N}_$]*$").expect("identifier pattern")
    });
    re.is_match(name) && !is_keyword(name)
}

/// Whether a variable name carries no information
///
/// Single letters (optionally numbered), generated `var12`/`arg0` style names
/// and confusable `lIl1`/`O0O` sequences qualify.
pub fn is_meaningless(name: &str) -> bool {
    let re = MEANINGLESS.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z_$][0-9]*|(?:var|arg|param|local|tmp|obj)[0-9]+|[lIO_$][lIO01_$]+)$")
            .expect("meaningless name pattern")
    });
    re.is_match(name)
}

/// Replaceable heuristic that may synthesize a display name for a variable
pub trait NamingPolicy {
    /// Propose a name for `symbol`; `taken` reports names that must not be used
    fn suggest(&self, symbol: &Symbol, taken: &dyn Fn(&str) -> bool) -> Option<String>;
}

/// Keeps every name as written
#[derive(Debug, Default, Clone, Copy)]
pub struct Preserve;

impl NamingPolicy for Preserve {
    fn suggest(&self, _symbol: &Symbol, _taken: &dyn Fn(&str) -> bool) -> Option<String> {
        None
    }
}

/// Names meaningless variables after their declared type
///
/// `StringBuilder a` becomes `stringBuilder`, `int b` becomes `num`,
/// `String[] c` becomes `strArray`. Collisions get a numeric suffix.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeDerived;

impl TypeDerived {
    /// Base name for a declared type, if the type itself says anything
    pub fn base_name(declared_type: &str) -> Option<String> {
        let mut element = declared_type.trim();
        let mut dims = 0;
        while let Some(stripped) = element.strip_suffix("[]") {
            element = stripped.trim_end();
            dims += 1;
        }
        let simple = element.rsplit('.').next().unwrap_or(element);

        let base = match simple {
            "" | "var" => return None,
            "int" | "long" | "short" | "byte" => "num".to_string(),
            "char" => "ch".to_string(),
            "boolean" => "flag".to_string(),
            "float" | "double" => "value".to_string(),
            "String" => "str".to_string(),
            "Object" => "obj".to_string(),
            "Class" => "clazz".to_string(),
            other => {
                if is_meaningless(other) {
                    return None;
                }
                lower_camel(other)
            }
        };

        let mut name = if dims > 0 { format!("{}Array", base) } else { base };
        if is_keyword(&name) {
            name.push_str("Value");
        }
        Some(name)
    }
}

impl NamingPolicy for TypeDerived {
    fn suggest(&self, symbol: &Symbol, taken: &dyn Fn(&str) -> bool) -> Option<String> {
        if !symbol.kind.is_variable() || !is_meaningless(&symbol.declared_name) {
            return None;
        }
        let base = Self::base_name(symbol.declared_type.as_deref()?)?;

        if !taken(&base) {
            return Some(base);
        }
        (2..)
            .map(|n| format!("{}{}", base, n))
            .find(|candidate| !taken(candidate))
    }
}

/// `HTTPClient` -> `httpClient`, `URL` -> `url`, `Connection` -> `connection`
fn lower_camel(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let upper_run = chars.iter().take_while(|c| c.is_uppercase()).count();

    let split = match upper_run {
        0 => return name.to_string(),
        n if n == chars.len() => n,
        1 => 1,
        n => n - 1,
    };

    chars[..split]
        .iter()
        .flat_map(|c| c.to_lowercase())
        .chain(chars[split..].iter().copied())
        .collect()
}
