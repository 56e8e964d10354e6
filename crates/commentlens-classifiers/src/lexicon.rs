//! Sentiment lexicon tables
//!
//! Curated positive/negative word lists are bundled as data files and may be
//! replaced from configuration. Modifier words, platform slang and emoji are
//! fixed tables.

use commentlens_core::Result;
use commentlens_index::{parse_word_list, read_word_list};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_POSITIVE: &str = include_str!("../data/positive.txt");
const DEFAULT_NEGATIVE: &str = include_str!("../data/negative.txt");

/// Weight of a curated lexicon hit
pub const CURATED_WEIGHT: f64 = 1.0;

/// Weight of a slang lexicon hit
pub const SLANG_WEIGHT: f64 = 1.5;

const NEGATION: &[&str] = &[
    "不", "没", "非", "无", "未", "别", "莫", "勿", "否", "不是", "没有", "不会", "不能", "不要", "不可",
    "不太", "不了", "不到", "不让", "不敢", "不想", "不该", "不必", "并非", "毫无", "从未", "绝非", "休想",
];

const AMPLIFY: &[&str] = &[
    "很", "非常", "极", "极其", "太", "特别", "超", "超级", "十分", "格外", "尤其", "万分", "无比", "最",
    "真", "真的", "确实", "实在", "相当", "巨", "贼", "老", "死", "暴", "狠", "过于", "极度", "异常",
    "无敌", "绝对", "简直",
];

const WEAKEN: &[&str] = &[
    "有点", "有些", "稍", "稍微", "略", "略微", "一点", "一些", "几分", "多少", "不太", "不怎么", "还行",
];

const SLANG_POSITIVE: &[&str] = &[
    "awsl", "yyds", "绝绝子", "泪目", "破防", "上头", "好家伙", "666", "nb", "牛批", "牛逼", "tql", "太强了",
    "爱了", "dddd", "冲冲冲", "催更", "笑死", "好活", "哈哈", "嗯嗯", "可以", "不错", "厉害", "给力", "高级",
    "良心", "感谢up", "三连", "火钳刘明", "答案", "干货", "学到了", "涨知识", "宝藏", "神作", "封神", "名场面",
    "经典", "传奇", "好看", "好听", "好玩", "有趣", "搞笑", "快乐", "温暖", "治愈", "舒服", "过瘾", "解压",
    "前排", "打卡", "来了", "蹲一个", "大佬", "dalao", "膜拜", "orz", "跪了", "xswl", "哈哈哈", "233", "2333",
    "23333",
];

const SLANG_NEGATIVE: &[&str] = &[
    "下头", "寒心", "摆烂", "炒冷饭", "烂尾", "智商税", "割韭菜", "收割", "营销号", "标题党", "拉胯", "翻车",
    "踩雷", "避雷", "跑路", "跟风", "蹭热度", "水视频", "混剪", "差评", "低能", "脑残", "弱智", "傻逼", "骗子",
    "骗人", "忽悠", "坑", "坑爹", "难看", "难听", "无聊", "尴尬", "硬凹", "劝退", "弃了", "没救了", "不行",
    "算了", "mmp", "wqnmlgb", "草", "淦", "尬", "举报", "抄袭", "盗用", "洗稿",
];

/// Emoji counted as positive
pub const EMOJI_POSITIVE: &[&str] = &[
    "😀", "😁", "😂", "🤣", "😃", "😄", "😆", "😍", "🥰", "😘", "😊", "🥳", "🎉", "👍", "👏", "❤️", "💕",
    "💯", "🔥", "✨", "💪", "🙌", "😎", "🤩", "⭐", "🌟", "💖", "💗", "😻", "🫶", "👌", "🤝", "🥇", "🏆",
    "🎊", "🎁", "💐", "🌹",
];

/// Emoji counted as negative
pub const EMOJI_NEGATIVE: &[&str] = &[
    "😢", "😭", "😠", "😡", "🤮", "🤢", "💩", "👎", "😤", "😩", "😫", "😰", "😱", "🙄", "😒", "🥲", "💔",
    "⚠️", "❌", "🚫", "😞", "😔", "😟", "😿", "🤡", "👻",
];

/// Lexicon override files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconConfig {
    /// Replacement positive word list
    #[serde(default)]
    pub positive: Option<PathBuf>,

    /// Replacement negative word list
    #[serde(default)]
    pub negative: Option<PathBuf>,

    /// Replacement stopword list (used by the indexer)
    #[serde(default)]
    pub stopwords: Option<PathBuf>,
}

/// Effect of a token on the scorer state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenRole {
    /// Flips the sign of the next sentiment-bearing token
    Negation,
    /// Sets the degree multiplier for the next sentiment-bearing token
    Degree(f64),
    /// Carries a base sentiment weight
    Sentiment(f64),
    /// No sentiment; clears pending modifiers
    Plain,
}

/// All tables consulted by the lexicon scorer
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: HashSet<String>,
    negative: HashSet<String>,
    slang_positive: HashSet<&'static str>,
    slang_negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
    amplify: HashSet<&'static str>,
    weaken: HashSet<&'static str>,
}

impl Lexicon {
    /// Bundled curated lists plus the fixed tables
    pub fn bundled() -> Result<Self> {
        Ok(Self::with_curated(
            parse_word_list(DEFAULT_POSITIVE)?,
            parse_word_list(DEFAULT_NEGATIVE)?,
        ))
    }

    /// Bundled lists, with any configured override files loaded in their place
    pub fn from_config(config: &LexiconConfig) -> Result<Self> {
        let positive = match &config.positive {
            Some(path) => {
                let words = read_word_list(path)?;
                info!("Loaded {} positive words from {:?}", words.len(), path);
                words
            }
            None => parse_word_list(DEFAULT_POSITIVE)?,
        };
        let negative = match &config.negative {
            Some(path) => {
                let words = read_word_list(path)?;
                info!("Loaded {} negative words from {:?}", words.len(), path);
                words
            }
            None => parse_word_list(DEFAULT_NEGATIVE)?,
        };
        Ok(Self::with_curated(positive, negative))
    }

    /// Fixed tables with the given curated lists
    pub fn with_curated(positive: HashSet<String>, negative: HashSet<String>) -> Self {
        Self {
            positive,
            negative,
            slang_positive: SLANG_POSITIVE.iter().copied().collect(),
            slang_negative: SLANG_NEGATIVE.iter().copied().collect(),
            negation: NEGATION.iter().copied().collect(),
            amplify: AMPLIFY.iter().copied().collect(),
            weaken: WEAKEN.iter().copied().collect(),
        }
    }

    /// Classify a token. Modifiers are checked in the order negation,
    /// amplify, weaken; curated lists take precedence over slang.
    pub fn role(&self, token: &str) -> TokenRole {
        if self.negation.contains(token) {
            return TokenRole::Negation;
        }
        if self.amplify.contains(token) {
            return TokenRole::Degree(2.0);
        }
        if self.weaken.contains(token) {
            return TokenRole::Degree(0.5);
        }

        match self.weight(token) {
            Some(weight) => TokenRole::Sentiment(weight),
            None => TokenRole::Plain,
        }
    }

    fn weight(&self, token: &str) -> Option<f64> {
        if self.positive.contains(token) {
            return Some(CURATED_WEIGHT);
        }
        if self.negative.contains(token) {
            return Some(-CURATED_WEIGHT);
        }

        let lower = token.to_lowercase();
        if self.slang_positive.contains(token) || self.slang_positive.contains(lower.as_str()) {
            Some(SLANG_WEIGHT)
        } else if self.slang_negative.contains(token) || self.slang_negative.contains(lower.as_str()) {
            Some(-SLANG_WEIGHT)
        } else {
            None
        }
    }

    pub fn positive_len(&self) -> usize {
        self.positive.len()
    }

    pub fn negative_len(&self) -> usize {
        self.negative.len()
    }
}
