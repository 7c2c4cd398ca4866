/// Languages offered for dictation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "english",
        }
    }

    /// BCP 47 tag handed to the speech capture side.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::English => "en-US",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" | "en-us" => Ok(Language::English),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}
