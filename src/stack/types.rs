//! Language and framework classification types.

use serde::{Deserialize, Serialize};

/// Primary language of an analyzed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Elixir,
    Python,
    JavaScript,
    TypeScript,
    Ruby,
    Go,
    Java,
    Php,
    Rust,
    CSharp,
    Unknown,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::Elixir,
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Ruby,
        Language::Go,
        Language::Java,
        Language::Php,
        Language::Rust,
        Language::CSharp,
        Language::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Elixir => "elixir",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Ruby => "ruby",
            Language::Go => "go",
            Language::Java => "java",
            Language::Php => "php",
            Language::Rust => "rust",
            Language::CSharp => "csharp",
            Language::Unknown => "unknown",
        }
    }

    /// Whether this is one of the two Node-ecosystem languages.
    pub fn is_node(&self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown language: {}", s))
    }
}

/// Web/application framework, scoped to a [`Language`].
///
/// The plain-language variants (`Elixir`, `Python`, `Ruby`, ...) mean the
/// language was recognized but no specific framework matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    // Elixir
    Phoenix,
    Elixir,
    // Python
    Django,
    Flask,
    #[serde(rename = "fastapi")]
    FastApi,
    Python,
    // Node
    Next,
    Nuxt,
    Svelte,
    Vue,
    React,
    Express,
    Fastify,
    Hono,
    // Ruby
    Rails,
    Ruby,
    // Go
    Gin,
    Echo,
    Fiber,
    Gorilla,
    Go,
    // Rust
    Actix,
    Axum,
    Rocket,
    Warp,
    Rust,
    // Java
    Spring,
    Quarkus,
    Micronaut,
    Java,
    // PHP
    Laravel,
    Symfony,
    Php,
    // C#
    Dotnet,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Phoenix => "phoenix",
            Framework::Elixir => "elixir",
            Framework::Django => "django",
            Framework::Flask => "flask",
            Framework::FastApi => "fastapi",
            Framework::Python => "python",
            Framework::Next => "next",
            Framework::Nuxt => "nuxt",
            Framework::Svelte => "svelte",
            Framework::Vue => "vue",
            Framework::React => "react",
            Framework::Express => "express",
            Framework::Fastify => "fastify",
            Framework::Hono => "hono",
            Framework::Rails => "rails",
            Framework::Ruby => "ruby",
            Framework::Gin => "gin",
            Framework::Echo => "echo",
            Framework::Fiber => "fiber",
            Framework::Gorilla => "gorilla",
            Framework::Go => "go",
            Framework::Actix => "actix",
            Framework::Axum => "axum",
            Framework::Rocket => "rocket",
            Framework::Warp => "warp",
            Framework::Rust => "rust",
            Framework::Spring => "spring",
            Framework::Quarkus => "quarkus",
            Framework::Micronaut => "micronaut",
            Framework::Java => "java",
            Framework::Laravel => "laravel",
            Framework::Symfony => "symfony",
            Framework::Php => "php",
            Framework::Dotnet => "dotnet",
        }
    }

    /// Node frameworks, in detection priority order.
    pub const NODE: [Framework; 8] = [
        Framework::Next,
        Framework::Nuxt,
        Framework::Svelte,
        Framework::Vue,
        Framework::React,
        Framework::Express,
        Framework::Fastify,
        Framework::Hono,
    ];
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The (language, framework) classification of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stack {
    pub language: Language,
    pub framework: Option<Framework>,
}

impl Stack {
    pub fn new(language: Language, framework: Option<Framework>) -> Self {
        Self {
            language,
            framework,
        }
    }

    pub fn unknown() -> Self {
        Self::new(Language::Unknown, None)
    }

    pub fn is_unknown(&self) -> bool {
        self.language == Language::Unknown
    }
}

impl std::fmt::Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.framework {
            Some(fw) => write!(f, "{}/{}", self.language, fw),
            None => write!(f, "{}", self.language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_roundtrip_str() {
        for lang in Language::ALL {
            assert_eq!(lang.as_str().parse::<Language>().unwrap(), lang);
        }
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn test_framework_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Framework::FastApi).unwrap(), "\"fastapi\"");
        assert_eq!(serde_json::to_string(&Framework::Dotnet).unwrap(), "\"dotnet\"");
    }

    #[test]
    fn test_stack_display() {
        assert_eq!(
            Stack::new(Language::Python, Some(Framework::Flask)).to_string(),
            "python/flask"
        );
        assert_eq!(Stack::new(Language::JavaScript, None).to_string(), "javascript");
    }
}
