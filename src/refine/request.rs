//! The user's selections for one refinement.
//!
//! Every selection accepts both the English and the Indonesian label so a
//! front end can pass whatever it shows. Values are normalized to English
//! before they reach the instruction builder.

use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Indonesian,
}

impl Language {
    pub fn label(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Indonesian => "Bahasa Indonesia",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "bahasa indonesia" | "indonesian" | "indonesia" | "id" => Ok(Language::Indonesian),
            other => bail!("Unknown language: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    #[default]
    TextGeneration,
    ImageGeneration,
    AudioGeneration,
    VideoGeneration,
    VideoAudioGeneration,
    Novel,
    Explanation,
    Other,
}

impl OutputType {
    pub const ALL: [OutputType; 8] = [
        OutputType::TextGeneration,
        OutputType::ImageGeneration,
        OutputType::AudioGeneration,
        OutputType::VideoGeneration,
        OutputType::VideoAudioGeneration,
        OutputType::Novel,
        OutputType::Explanation,
        OutputType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OutputType::TextGeneration => "Text Generation",
            OutputType::ImageGeneration => "Image Generation",
            OutputType::AudioGeneration => "Audio Generation",
            OutputType::VideoGeneration => "Video Generation",
            OutputType::VideoAudioGeneration => "Video+Audio Generation",
            OutputType::Novel => "Novel",
            OutputType::Explanation => "Explanation",
            OutputType::Other => "Other",
        }
    }

    fn indonesian_label(&self) -> &'static str {
        match self {
            OutputType::TextGeneration => "Generasi Teks",
            OutputType::ImageGeneration => "Generasi Gambar",
            OutputType::AudioGeneration => "Generasi Audio",
            OutputType::VideoGeneration => "Generasi Video",
            OutputType::VideoAudioGeneration => "Generasi Video+Audio",
            OutputType::Novel => "Novel",
            OutputType::Explanation => "Penjelasan",
            OutputType::Other => "Lainnya",
        }
    }

    /// Image, audio and video prompts skip the explicit language line.
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            OutputType::ImageGeneration
                | OutputType::AudioGeneration
                | OutputType::VideoGeneration
                | OutputType::VideoAudioGeneration
        )
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OutputType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        let short = match wanted.as_str() {
            "text" => Some(OutputType::TextGeneration),
            "image" => Some(OutputType::ImageGeneration),
            "audio" => Some(OutputType::AudioGeneration),
            "video" => Some(OutputType::VideoGeneration),
            "video+audio" | "video-audio" => Some(OutputType::VideoAudioGeneration),
            _ => None,
        };
        if let Some(t) = short {
            return Ok(t);
        }
        OutputType::ALL
            .into_iter()
            .find(|t| {
                t.label().to_lowercase() == wanted || t.indonesian_label().to_lowercase() == wanted
            })
            .ok_or_else(|| anyhow::anyhow!("Unknown output type: {}", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    Simple,
    #[default]
    Detailed,
    Complex,
    Template,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 4] = [
        DetailLevel::Simple,
        DetailLevel::Detailed,
        DetailLevel::Complex,
        DetailLevel::Template,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DetailLevel::Simple => "Simple",
            DetailLevel::Detailed => "Detailed",
            DetailLevel::Complex => "Complex",
            DetailLevel::Template => "Template",
        }
    }

    fn indonesian_label(&self) -> &'static str {
        match self {
            DetailLevel::Simple => "Sederhana",
            DetailLevel::Detailed => "Detail",
            DetailLevel::Complex => "Kompleks",
            DetailLevel::Template => "Template",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DetailLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        DetailLevel::ALL
            .into_iter()
            .find(|d| {
                d.label().to_lowercase() == wanted || d.indonesian_label().to_lowercase() == wanted
            })
            .ok_or_else(|| anyhow::anyhow!("Unknown detail level: {}", s.trim()))
    }
}

/// Indonesian scope label -> English.
const SCOPE_LABELS: &[(&str, &str)] = &[
    ("Umum", "General"),
    ("Pemrograman", "Programming"),
    ("Novel", "Novel"),
    ("Sains", "Science"),
    ("Matematika", "Math"),
    ("Pendidikan", "Education"),
    ("Sejarah", "History"),
    ("Filsafat", "Philosophy"),
    ("Bisnis", "Business"),
    ("Pemasaran", "Marketing"),
    ("Hukum", "Legal"),
    ("Medis", "Medical"),
    ("Penulisan Teknis", "Technical Writing"),
    ("Seni", "Art"),
    ("Musik", "Music"),
    ("Puisi", "Poetry"),
    ("Media Sosial", "Social Media"),
    ("Blog", "Blog"),
    ("Berita", "News"),
    ("Produktivitas", "Productivity"),
    ("Personal", "Personal"),
    ("Keuangan", "Finance"),
    ("Perjalanan", "Travel"),
    ("Memasak", "Cooking"),
    ("Game", "Gaming"),
    ("Wawancara", "Interview"),
    ("CV", "Resume"),
    ("Email", "Email"),
    ("Presentasi", "Presentation"),
    ("Riset", "Research"),
    ("Psikologi", "Psychology"),
    ("Bantuan Diri", "Self-help"),
    ("Spiritual", "Spirituality"),
    ("Parenting", "Parenting"),
    ("Kebugaran", "Fitness"),
    ("Kesehatan", "Health"),
    ("Fashion", "Fashion"),
    ("Kecantikan", "Beauty"),
    ("DIY", "DIY"),
    ("Fotografi", "Photography"),
    ("Film", "Film"),
    ("Teater", "Theater"),
    ("Komik", "Comics"),
    ("Penulisan Naskah", "Scriptwriting"),
    ("Jurnalisme", "Journalism"),
    ("Iklan", "Advertising"),
    ("UX/UI", "UX/UI"),
    ("Data Science", "Data Science"),
    ("AI/ML", "AI/ML"),
    ("Teknik", "Engineering"),
    ("Lingkungan", "Environment"),
    ("Politik", "Politics"),
    ("Olahraga", "Sports"),
    ("Lainnya", "Other"),
];

/// Domain scope, always held in English. Labels outside the table pass
/// through unchanged so users can name their own domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope(String);

impl Scope {
    pub fn general() -> Self {
        Scope("General".to_string())
    }

    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() {
            return Self::general();
        }
        let english = SCOPE_LABELS
            .iter()
            .find(|(id, en)| id.eq_ignore_ascii_case(label) || en.eq_ignore_ascii_case(label))
            .map(|(_, en)| en.to_string())
            .unwrap_or_else(|| label.to_string());
        Scope(english)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_general(&self) -> bool {
        self.0 == "General"
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::general()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinementRequest {
    pub prompt: String,
    pub context: String,
    pub language: Language,
    pub scope: Scope,
    pub output_type: OutputType,
    pub detail: DetailLevel,
}

impl RefinementRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    pub fn with_detail(mut self, detail: DetailLevel) -> Self {
        self.detail = detail;
        self
    }
}
