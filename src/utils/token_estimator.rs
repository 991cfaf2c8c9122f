/// Token估算器，按字符类别粗略估算文本的token数量
pub struct TokenEstimator {
    english_char_per_token: f64,
    cjk_char_per_token: f64,
    base_token_overhead: usize,
}

/// Token估算结果
#[derive(Debug, Clone)]
pub struct TokenEstimation {
    pub estimated_tokens: usize,
    pub character_count: usize,
    pub cjk_char_count: usize,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenEstimator {
    pub fn new() -> Self {
        Self {
            // 基于GPT系列模型的经验值
            english_char_per_token: 4.0,
            cjk_char_per_token: 1.5,
            base_token_overhead: 50,
        }
    }

    /// 估算文本的token数量，空文本不计基础开销
    pub fn estimate_tokens(&self, text: &str) -> TokenEstimation {
        let character_count = text.chars().count();
        if character_count == 0 {
            return TokenEstimation {
                estimated_tokens: 0,
                character_count,
                cjk_char_count: 0,
            };
        }
        let cjk_char_count = text.chars().filter(|c| is_cjk_char(*c)).count();
        let other_char_count = character_count - cjk_char_count;

        let cjk_tokens = (cjk_char_count as f64 / self.cjk_char_per_token).ceil() as usize;
        let other_tokens = (other_char_count as f64 / self.english_char_per_token).ceil() as usize;

        TokenEstimation {
            estimated_tokens: cjk_tokens + other_tokens + self.base_token_overhead,
            character_count,
            cjk_char_count,
        }
    }
}

fn is_cjk_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF |  // CJK统一汉字
        0x3400..=0x4DBF |  // CJK扩展A
        0x3040..=0x30FF |  // 平假名、片假名
        0xAC00..=0xD7AF |  // 韩文音节
        0x20000..=0x2A6DF  // CJK扩展B
    )
}
