// 💬 Review Sentiment - lexicon polarity, product and seller feedback
//
// Comments are cleaned (lowercase, short words and punctuation removed),
// scored against a word lexicon and bucketed into positive / neutral /
// negative. The bucket is then joined back to products and sellers.

use crate::entities::{OrderItem, Review, Seller};
use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

static SHORT_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w{1,2}\b").expect("valid regex"));
static PUNCTUATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Lowercase, drop words of one or two characters, drop punctuation
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_short = SHORT_WORD_RE.replace_all(&lowered, "");
    PUNCTUATION_RE.replace_all(&without_short, "").into_owned()
}

// ============================================================================
// SENTIMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.0 {
            Sentiment::Positive
        } else if polarity < 0.0 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// LEXICON
// ============================================================================

const DEFAULT_WORDS: &[(&str, f64)] = &[
    // English
    ("good", 0.7),
    ("great", 0.8),
    ("excellent", 1.0),
    ("amazing", 0.6),
    ("love", 0.5),
    ("loved", 0.7),
    ("perfect", 1.0),
    ("best", 1.0),
    ("wonderful", 1.0),
    ("beautiful", 0.85),
    ("nice", 0.6),
    ("happy", 0.8),
    ("satisfied", 0.5),
    ("recommend", 0.4),
    ("fast", 0.2),
    ("quick", 0.33),
    ("bad", -0.7),
    ("poor", -0.4),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("horrible", -1.0),
    ("worst", -1.0),
    ("broken", -0.4),
    ("damaged", -0.6),
    ("defective", -0.6),
    ("wrong", -0.5),
    ("late", -0.3),
    ("slow", -0.3),
    ("useless", -0.5),
    ("disappointed", -0.75),
    // Portuguese
    ("bom", 0.7),
    ("boa", 0.7),
    ("ótimo", 0.8),
    ("otimo", 0.8),
    ("ótima", 0.8),
    ("otima", 0.8),
    ("excelente", 1.0),
    ("perfeito", 1.0),
    ("perfeita", 1.0),
    ("adorei", 0.7),
    ("amei", 0.7),
    ("gostei", 0.6),
    ("recomendo", 0.5),
    ("lindo", 0.8),
    ("linda", 0.8),
    ("maravilhoso", 1.0),
    ("satisfeito", 0.5),
    ("satisfeita", 0.5),
    ("rápido", 0.3),
    ("rapido", 0.3),
    ("rápida", 0.3),
    ("rapida", 0.3),
    ("ruim", -0.7),
    ("péssimo", -1.0),
    ("pessimo", -1.0),
    ("péssima", -1.0),
    ("pessima", -1.0),
    ("horrível", -1.0),
    ("horrivel", -1.0),
    ("defeito", -0.6),
    ("quebrado", -0.5),
    ("quebrada", -0.5),
    ("errado", -0.5),
    ("errada", -0.5),
    ("atraso", -0.4),
    ("atrasado", -0.4),
    ("demorou", -0.3),
    ("decepcionado", -0.75),
    ("decepcionada", -0.75),
];

const DEFAULT_NEGATORS: &[&str] = &["not", "no", "never", "não", "nao", "nunca"];

/// Multiplier applied to a word right after a negator
pub const NEGATION_FACTOR: f64 = -0.5;

fn default_negators() -> BTreeSet<String> {
    DEFAULT_NEGATORS.iter().map(|s| s.to_string()).collect()
}

/// Word polarities in [-1, 1] plus the words that flip them
///
/// JSON form: `{ "words": { "good": 0.7 }, "negators": ["not"] }`;
/// `negators` may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    words: BTreeMap<String, f64>,
    #[serde(default = "default_negators")]
    negators: BTreeSet<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Lexicon {
            words: DEFAULT_WORDS
                .iter()
                .map(|(w, p)| (w.to_string(), *p))
                .collect(),
            negators: default_negators(),
        }
    }
}

impl Lexicon {
    /// Load a lexicon from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut lexicon: Lexicon =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        if let Some((word, polarity)) = lexicon
            .words
            .iter()
            .find(|(_, p)| !(-1.0..=1.0).contains(*p))
        {
            return Err(ConfigError::Invalid(format!(
                "lexicon word '{}' has polarity {} outside [-1, 1]",
                word, polarity
            )));
        }

        // Lookups happen on lowercased text
        lexicon.words = lexicon
            .words
            .into_iter()
            .map(|(w, p)| (w.to_lowercase(), p))
            .collect();

        info!(path = %path.display(), words = lexicon.words.len(), "loaded sentiment lexicon");
        Ok(lexicon)
    }

    /// Lexicon from `path` when given, built-in otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Mean polarity of lexicon hits in `text`; 0 when nothing matches
    pub fn polarity(&self, text: &str) -> f64 {
        let mut total = 0.0;
        let mut hits = 0usize;
        let mut previous: Option<&str> = None;

        for token in text.split_whitespace() {
            if let Some(&score) = self.words.get(token) {
                let negated = previous.is_some_and(|p| self.negators.contains(p));
                total += if negated { score * NEGATION_FACTOR } else { score };
                hits += 1;
            }
            previous = Some(token);
        }

        if hits == 0 {
            0.0
        } else {
            total / hits as f64
        }
    }

    pub fn classify(&self, cleaned: &str) -> Sentiment {
        Sentiment::from_polarity(self.polarity(cleaned))
    }

    /// `clean_text`, except that short negators such as "no" are kept
    pub fn prepare(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let without_short = SHORT_WORD_RE.replace_all(&lowered, |caps: &regex::Captures| {
            if self.negators.contains(&caps[0]) {
                caps[0].to_string()
            } else {
                String::new()
            }
        });
        PUNCTUATION_RE.replace_all(&without_short, "").into_owned()
    }

    /// Clean then classify raw comment text
    pub fn classify_comment(&self, text: &str) -> Sentiment {
        self.classify(&self.prepare(text))
    }
}

/// Classify a raw comment with the built-in lexicon
pub fn classify_comment(text: &str) -> Sentiment {
    Lexicon::default().classify_comment(text)
}

// ============================================================================
// REVIEW ANALYSIS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    pub fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    pub fn positive_ratio(&self) -> f64 {
        ratio(self.positive, self.total())
    }

    pub fn negative_ratio(&self) -> f64 {
        ratio(self.negative, self.total())
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// A review that has both a comment and a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedReview {
    pub order_id: String,
    pub score: f64,
    pub cleaned: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSentiment {
    pub product_id: String,
    pub counts: SentimentCounts,
    pub positive_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerSentiment {
    pub seller_id: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub counts: SentimentCounts,
    pub negative_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub sentiment: Sentiment,
    pub mean_score: f64,
    pub rows: usize,
}

/// Every table the `sentiment` command prints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAnalysis {
    /// Reviews with both comment and score
    pub reviews_considered: usize,
    /// Review rows after the order-item join
    pub joined_rows: usize,
    pub totals: SentimentCounts,
    pub best_products: Vec<ProductSentiment>,
    pub worst_products: Vec<ProductSentiment>,
    pub worst_sellers: Vec<SellerSentiment>,
    pub score_by_sentiment: Vec<SentimentScore>,
    /// Number of joined rows per score 1..=5
    pub score_histogram: [usize; 5],
    pub price_mentions: usize,
    pub price_mention_examples: Vec<String>,
}

/// Classify every review that carries both a comment and a score
pub fn classify_reviews(reviews: &[Review], lexicon: &Lexicon) -> Vec<ClassifiedReview> {
    let classified: Vec<ClassifiedReview> = reviews
        .iter()
        .filter_map(|review| {
            let comment = review.comment()?;
            let score = review.review_score?;
            let cleaned = clean_text(comment);
            let sentiment = lexicon.classify_comment(comment);
            Some(ClassifiedReview {
                order_id: review.order_id.clone(),
                score,
                cleaned,
                sentiment,
            })
        })
        .collect();

    debug!(
        reviews = reviews.len(),
        classified = classified.len(),
        "classified review comments"
    );
    classified
}

fn keyword_regex(keywords: &[String]) -> Option<Regex> {
    if keywords.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| regex::escape(&k.to_lowercase()))
        .collect();
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).ok()
}

/// Sentiment summaries per product, per seller and per score
///
/// Reviews are left-joined to order items, so an order with several items
/// counts once per item and an order with none keeps its row without a
/// product or seller. Product and seller counts are zero-filled.
pub fn analyze_reviews(
    reviews: &[Review],
    order_items: &[OrderItem],
    sellers: &[Seller],
    lexicon: &Lexicon,
    top_n: usize,
    price_keywords: &[String],
) -> ReviewAnalysis {
    let classified = classify_reviews(reviews, lexicon);

    let mut items_by_order: HashMap<&str, Vec<&OrderItem>> = HashMap::new();
    for item in order_items {
        items_by_order.entry(item.order_id.as_str()).or_default().push(item);
    }
    let sellers_by_id: HashMap<&str, &Seller> =
        sellers.iter().map(|s| (s.seller_id.as_str(), s)).collect();

    let price_re = keyword_regex(price_keywords);

    let mut totals = SentimentCounts::default();
    let mut per_product: BTreeMap<&str, SentimentCounts> = BTreeMap::new();
    let mut per_seller: BTreeMap<&str, SentimentCounts> = BTreeMap::new();
    let mut score_sums: BTreeMap<Sentiment, (f64, usize)> = BTreeMap::new();
    let mut histogram = [0usize; 5];
    let mut joined_rows = 0usize;
    let mut price_mentions = 0usize;
    let mut price_mention_examples = Vec::new();

    for review in &classified {
        totals.add(review.sentiment);

        let items = items_by_order
            .get(review.order_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        // Left join: an unmatched review still counts once
        let rows = items.len().max(1);
        joined_rows += rows;

        for item in items {
            per_product
                .entry(item.product_id.as_str())
                .or_default()
                .add(review.sentiment);
            per_seller
                .entry(item.seller_id.as_str())
                .or_default()
                .add(review.sentiment);
        }

        // Scores are whole stars
        let stars = review.score.trunc();
        let entry = score_sums.entry(review.sentiment).or_insert((0.0, 0));
        entry.0 += stars * rows as f64;
        entry.1 += rows;
        if (1.0..=5.0).contains(&stars) {
            histogram[stars as usize - 1] += rows;
        }

        if price_re.as_ref().is_some_and(|re| re.is_match(&review.cleaned)) {
            price_mentions += rows;
            if price_mention_examples.len() < top_n {
                price_mention_examples.push(review.cleaned.trim().to_string());
            }
        }
    }

    let mut products: Vec<ProductSentiment> = per_product
        .into_iter()
        .map(|(id, counts)| ProductSentiment {
            product_id: id.to_string(),
            positive_ratio: counts.positive_ratio(),
            counts,
        })
        .collect();
    products.sort_by(|a, b| {
        b.positive_ratio
            .total_cmp(&a.positive_ratio)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    let best_products: Vec<ProductSentiment> = products.iter().take(top_n).cloned().collect();
    let mut worst_products = products;
    worst_products.sort_by(|a, b| {
        a.positive_ratio
            .total_cmp(&b.positive_ratio)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    worst_products.truncate(top_n);

    let mut worst_sellers: Vec<SellerSentiment> = per_seller
        .into_iter()
        .map(|(id, counts)| {
            let seller = sellers_by_id.get(id);
            SellerSentiment {
                seller_id: id.to_string(),
                city: seller.and_then(|s| s.seller_city.clone()),
                state: seller.and_then(|s| s.seller_state.clone()),
                negative_ratio: counts.negative_ratio(),
                counts,
            }
        })
        .collect();
    worst_sellers.sort_by(|a, b| {
        b.negative_ratio
            .total_cmp(&a.negative_ratio)
            .then_with(|| a.seller_id.cmp(&b.seller_id))
    });
    worst_sellers.truncate(top_n);

    let score_by_sentiment = score_sums
        .into_iter()
        .map(|(sentiment, (sum, rows))| SentimentScore {
            sentiment,
            mean_score: sum / rows as f64,
            rows,
        })
        .collect();

    info!(
        reviews = classified.len(),
        positive = totals.positive,
        neutral = totals.neutral,
        negative = totals.negative,
        "review sentiment analysed"
    );

    ReviewAnalysis {
        reviews_considered: classified.len(),
        joined_rows,
        totals,
        best_products,
        worst_products,
        worst_sellers,
        score_by_sentiment,
        score_histogram: histogram,
        price_mentions,
        price_mention_examples,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn review(order: &str, score: Option<f64>, comment: Option<&str>) -> Review {
        Review {
            order_id: order.to_string(),
            review_score: score,
            review_comment_message: comment.map(str::to_string),
        }
    }

    fn item(order: &str, product: &str, seller: &str) -> OrderItem {
        OrderItem {
            order_id: order.to_string(),
            order_item_id: 1,
            product_id: product.to_string(),
            seller_id: seller.to_string(),
            price: 10.0,
        }
    }

    fn keywords() -> Vec<String> {
        vec!["price".to_string(), "preço".to_string()]
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("It's GREAT!!"), " great");
        assert_eq!(clean_text("A ok product."), "  product");
        assert_eq!(clean_text("Não é bom"), "não  bom");
    }

    #[test]
    fn test_clear_cases() {
        assert_eq!(classify_comment("Excellent product, I loved it!"), Sentiment::Positive);
        assert_eq!(classify_comment("Terrible. It arrived broken."), Sentiment::Negative);
        assert_eq!(classify_comment("The package arrived on Tuesday."), Sentiment::Neutral);
        assert_eq!(classify_comment("Produto ótimo, recomendo"), Sentiment::Positive);
        assert_eq!(classify_comment(""), Sentiment::Neutral);
    }

    #[test]
    fn test_negator_flips_next_word() {
        let lexicon = Lexicon::default();
        assert!((lexicon.polarity("gostei") - 0.6).abs() < 1e-12);
        assert!((lexicon.polarity("não gostei") + 0.3).abs() < 1e-12);
        assert_eq!(lexicon.classify_comment("Não gostei do produto"), Sentiment::Negative);
    }

    #[test]
    fn test_two_letter_negator_survives_cleaning() {
        let lexicon = Lexicon::default();
        assert_eq!(lexicon.prepare("No good!"), "no good");
        assert_eq!(lexicon.classify_comment("no good"), Sentiment::Negative);
        assert_eq!(lexicon.classify_comment("It is no good at all"), Sentiment::Negative);
        // Other short words still drop out before scoring
        assert_eq!(lexicon.classify_comment("not so good"), Sentiment::Negative);
    }

    #[test]
    fn test_whitespace_comment_is_classified_neutral() {
        let reviews = vec![
            review("o1", Some(3.0), Some("   ")),
            review("o2", Some(4.0), None),
        ];
        let classified = classify_reviews(&reviews, &Lexicon::default());

        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].order_id, "o1");
        assert_eq!(classified[0].sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_polarity_is_mean_of_hits() {
        let lexicon = Lexicon::default();
        // good 0.7, bad -0.7
        assert_eq!(lexicon.polarity("good but bad"), 0.0);
        assert!((lexicon.polarity("great excellent") - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_lexicon_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "words": {{ "Splendid": 0.9, "meh": -0.1 }} }}"#).unwrap();

        let lexicon = Lexicon::from_file(file.path()).unwrap();
        assert_eq!(lexicon.len(), 2);
        assert_eq!(lexicon.classify_comment("Splendid!"), Sentiment::Positive);
        assert_eq!(lexicon.classify_comment("not splendid"), Sentiment::Negative);
    }

    #[test]
    fn test_lexicon_out_of_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "words": {{ "great": 3.0 }} }}"#).unwrap();

        assert!(matches!(
            Lexicon::from_file(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_reviews_without_comment_or_score_dropped() {
        let reviews = vec![
            review("o1", Some(5.0), Some("great")),
            review("o2", Some(4.0), None),
            review("o3", None, Some("bad")),
            review("o4", Some(3.0), Some("   ")),
        ];
        let classified = classify_reviews(&reviews, &Lexicon::default());
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_analyze_reviews() {
        let reviews = vec![
            review("o1", Some(5.0), Some("Excellent, loved it")),
            review("o2", Some(1.0), Some("Terrible, arrived broken")),
            review("o3", Some(4.0), Some("Good price")),
            review("o4", Some(3.0), Some("Arrived on time")),
            review("o5", Some(2.0), Some("Bad")),
        ];
        let items = vec![
            item("o1", "p1", "s1"),
            item("o2", "p2", "s2"),
            item("o3", "p1", "s1"),
            item("o4", "p2", "s1"),
            // o5 has no items: kept by the left join without product
        ];
        let sellers = vec![Seller {
            seller_id: "s2".to_string(),
            seller_city: Some("campinas".to_string()),
            seller_state: Some("SP".to_string()),
        }];

        let analysis = analyze_reviews(&reviews, &items, &sellers, &Lexicon::default(), 10, &keywords());

        assert_eq!(analysis.reviews_considered, 5);
        assert_eq!(analysis.joined_rows, 5);
        assert_eq!(analysis.totals.positive, 2);
        assert_eq!(analysis.totals.negative, 2);
        assert_eq!(analysis.totals.neutral, 1);

        assert_eq!(analysis.best_products[0].product_id, "p1");
        assert_eq!(analysis.best_products[0].positive_ratio, 1.0);
        assert_eq!(analysis.worst_products[0].product_id, "p2");
        assert_eq!(analysis.worst_products[0].counts.positive, 0);

        assert_eq!(analysis.worst_sellers[0].seller_id, "s2");
        assert_eq!(analysis.worst_sellers[0].city.as_deref(), Some("campinas"));
        assert_eq!(analysis.worst_sellers[1].city, None);

        assert_eq!(analysis.score_histogram, [1, 1, 1, 1, 1]);
        let positive = &analysis.score_by_sentiment[0];
        assert_eq!(positive.sentiment, Sentiment::Positive);
        assert!((positive.mean_score - 4.5).abs() < 1e-12);

        assert_eq!(analysis.price_mentions, 1);
        assert_eq!(analysis.price_mention_examples, vec!["good price".to_string()]);
    }

    #[test]
    fn test_multi_item_order_counts_per_item() {
        let reviews = vec![review("o1", Some(5.0), Some("great"))];
        let items = vec![item("o1", "p1", "s1"), item("o1", "p2", "s1")];

        let analysis = analyze_reviews(&reviews, &items, &[], &Lexicon::default(), 5, &keywords());

        assert_eq!(analysis.joined_rows, 2);
        assert_eq!(analysis.best_products.len(), 2);
        assert_eq!(analysis.worst_sellers[0].counts.positive, 2);
        assert_eq!(analysis.score_histogram[4], 2);
    }
}
