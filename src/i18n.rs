use serde::{Deserialize, Serialize};

/// 报告语言
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum TargetLanguage {
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "en")]
    #[default]
    English,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ru")]
    Russian,
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLanguage::Chinese => write!(f, "zh"),
            TargetLanguage::English => write!(f, "en"),
            TargetLanguage::Japanese => write!(f, "ja"),
            TargetLanguage::Korean => write!(f, "ko"),
            TargetLanguage::German => write!(f, "de"),
            TargetLanguage::French => write!(f, "fr"),
            TargetLanguage::Russian => write!(f, "ru"),
        }
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zh" | "chinese" | "中文" => Ok(TargetLanguage::Chinese),
            "en" | "english" | "英文" => Ok(TargetLanguage::English),
            "ja" | "japanese" | "日本語" | "日文" => Ok(TargetLanguage::Japanese),
            "ko" | "korean" | "한국어" | "韩文" => Ok(TargetLanguage::Korean),
            "de" | "german" | "deutsch" | "德文" => Ok(TargetLanguage::German),
            "fr" | "french" | "français" | "法文" => Ok(TargetLanguage::French),
            "ru" | "russian" | "русский" | "俄文" => Ok(TargetLanguage::Russian),
            _ => Err(format!("Unknown target language: {}", s)),
        }
    }
}

impl TargetLanguage {
    /// 获取语言的描述性名称
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetLanguage::Chinese => "中文",
            TargetLanguage::English => "English",
            TargetLanguage::Japanese => "日本語",
            TargetLanguage::Korean => "한국어",
            TargetLanguage::German => "Deutsch",
            TargetLanguage::French => "Français",
            TargetLanguage::Russian => "Русский",
        }
    }

    /// 撰写报告时附加的语言指令
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            TargetLanguage::Chinese => "请使用中文撰写调研报告，术语准确、表达专业、易于理解。",
            TargetLanguage::English => {
                "Please write the research report in English, using accurate terminology and clear, professional language."
            }
            TargetLanguage::Japanese => {
                "調査レポートは日本語で作成してください。正確な用語を用い、専門的で分かりやすい表現を心がけてください。"
            }
            TargetLanguage::Korean => {
                "조사 보고서를 한국어로 작성해 주세요. 정확한 용어와 전문적이고 이해하기 쉬운 표현을 사용해 주세요."
            }
            TargetLanguage::German => {
                "Bitte verfassen Sie den Forschungsbericht auf Deutsch, mit präziser Terminologie und klarer, professioneller Sprache."
            }
            TargetLanguage::French => {
                "Veuillez rédiger le rapport de recherche en français, avec une terminologie précise et un langage clair et professionnel."
            }
            TargetLanguage::Russian => {
                "Пожалуйста, напишите исследовательский отчёт на русском языке, используя точную терминологию и ясный профессиональный стиль."
            }
        }
    }

    /// 报告文件名
    pub fn get_report_filename(&self) -> String {
        match self {
            TargetLanguage::Chinese => "调研报告.md".to_string(),
            TargetLanguage::English => "Research-Report.md".to_string(),
            TargetLanguage::Japanese => "調査レポート.md".to_string(),
            TargetLanguage::Korean => "조사-보고서.md".to_string(),
            TargetLanguage::German => "Forschungsbericht.md".to_string(),
            TargetLanguage::French => "Rapport-de-Recherche.md".to_string(),
            TargetLanguage::Russian => "Исследовательский-Отчёт.md".to_string(),
        }
    }
}
