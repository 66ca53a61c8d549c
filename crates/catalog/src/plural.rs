use icu_locid::Locale;
use icu_plurals::{PluralCategory as IcuPluralCategory, PluralRules};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ParseErrorKind;

/// Integers sampled when deriving which categories a locale can select.
const SAMPLE_LIMIT: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub const ALL: [PluralCategory; 6] = [
        PluralCategory::Zero,
        PluralCategory::One,
        PluralCategory::Two,
        PluralCategory::Few,
        PluralCategory::Many,
        PluralCategory::Other,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "zero" => Some(Self::Zero),
            "one" => Some(Self::One),
            "two" => Some(Self::Two),
            "few" => Some(Self::Few),
            "many" => Some(Self::Many),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Two => "two",
            Self::Few => "few",
            Self::Many => "many",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PluralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<IcuPluralCategory> for PluralCategory {
    fn from(value: IcuPluralCategory) -> Self {
        match value {
            IcuPluralCategory::Zero => PluralCategory::Zero,
            IcuPluralCategory::One => PluralCategory::One,
            IcuPluralCategory::Two => PluralCategory::Two,
            IcuPluralCategory::Few => PluralCategory::Few,
            IcuPluralCategory::Many => PluralCategory::Many,
            IcuPluralCategory::Other => PluralCategory::Other,
        }
    }
}

/// Position of a plural form within a numerus message.
/// （複數形式在訊息中的索引。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PluralBucket(usize);

impl PluralBucket {
    pub const FIRST: PluralBucket = PluralBucket(0);

    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// The bucket one step down, if any.
    pub fn lower(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

/// Maps counts to plural buckets for one locale.
///
/// Implementations must be immutable once constructed; catalogs share them
/// across reader threads.
pub trait PluralRule: fmt::Debug + Send + Sync {
    /// Categories in bucket order.
    fn categories(&self) -> &[PluralCategory];

    fn bucket_for(&self, count: u64) -> PluralBucket;

    /// Number of forms a numerus message must carry.
    fn cardinality(&self) -> usize {
        self.categories().len()
    }

    fn category(&self, bucket: PluralBucket) -> Option<PluralCategory> {
        self.categories().get(bucket.index()).copied()
    }
}

/// Supplies the plural rule for a catalog's declared language.
pub trait PluralRuleProvider: fmt::Debug + Send + Sync {
    fn rule_for(&self, locale: &str) -> Result<Arc<dyn PluralRule>, ParseErrorKind>;
}

/// Converts catalog language codes (`cs_CZ`, `sr@latin`, `de_DE.UTF-8`) to BCP-47 form.
/// （將目錄語系代碼轉換為 BCP-47 格式。）
pub fn normalize_locale(code: &str) -> String {
    let trimmed = code.trim();
    let base = trimmed
        .split(['.', '@'])
        .next()
        .unwrap_or(trimmed);
    base.replace('_', "-")
}

/// True when both codes name the same primary language (`da`, `da_DK`, `da-DK`).
pub fn same_language(left: &str, right: &str) -> bool {
    let primary = |code: &str| {
        normalize_locale(code)
            .split('-')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    };
    primary(left) == primary(right)
}

/// CLDR-backed rules from the compiled `icu_plurals` data.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcuPluralRules;

impl IcuPluralRules {
    pub fn new() -> Self {
        Self
    }
}

impl PluralRuleProvider for IcuPluralRules {
    fn rule_for(&self, locale: &str) -> Result<Arc<dyn PluralRule>, ParseErrorKind> {
        Ok(Arc::new(IcuPluralRule::try_new(locale)?))
    }
}

/// Cardinal rule for one locale, restricted to categories integers can reach.
pub struct IcuPluralRule {
    locale: String,
    rules: PluralRules,
    categories: Vec<PluralCategory>,
}

impl IcuPluralRule {
    pub fn try_new(locale: &str) -> Result<Self, ParseErrorKind> {
        let normalized = normalize_locale(locale);
        let parsed =
            Locale::from_str(&normalized).map_err(|error| ParseErrorKind::InvalidLocale {
                locale: locale.to_string(),
                error,
            })?;
        let rules = PluralRules::try_new_cardinal(&parsed.into())
            .map_err(|_| ParseErrorKind::UnsupportedLocale(locale.to_string()))?;

        let mut seen = [false; PluralCategory::ALL.len()];
        for count in 0..=SAMPLE_LIMIT {
            let category = PluralCategory::from(rules.category_for(count));
            seen[category as usize] = true;
        }
        let categories = PluralCategory::ALL
            .iter()
            .zip(seen)
            .filter_map(|(category, present)| present.then_some(*category))
            .collect();

        Ok(Self {
            locale: normalized,
            rules,
            categories,
        })
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl fmt::Debug for IcuPluralRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IcuPluralRule")
            .field("locale", &self.locale)
            .field("categories", &self.categories)
            .finish()
    }
}

impl PluralRule for IcuPluralRule {
    fn categories(&self) -> &[PluralCategory] {
        &self.categories
    }

    fn bucket_for(&self, count: u64) -> PluralBucket {
        let category = PluralCategory::from(self.rules.category_for(count));
        let position = self
            .categories
            .iter()
            .position(|candidate| *candidate == category)
            .or_else(|| {
                // Large integers can land in a category the sample never hit.
                self.categories
                    .iter()
                    .position(|candidate| *candidate == PluralCategory::Other)
            })
            .unwrap_or(self.categories.len().saturating_sub(1));
        PluralBucket::new(position)
    }
}

/// Rule with an explicit category list and selector function.
#[derive(Clone)]
pub struct FixedPluralRule {
    categories: Vec<PluralCategory>,
    selector: fn(u64) -> usize,
}

impl FixedPluralRule {
    pub fn new(categories: Vec<PluralCategory>, selector: fn(u64) -> usize) -> Self {
        Self {
            categories,
            selector,
        }
    }

    /// Languages without grammatical number.
    pub fn single_form() -> Self {
        Self::new(vec![PluralCategory::Other], |_| 0)
    }

    /// `one` for exactly 1, `other` for everything else.
    pub fn one_other() -> Self {
        Self::new(vec![PluralCategory::One, PluralCategory::Other], |count| {
            usize::from(count != 1)
        })
    }
}

impl fmt::Debug for FixedPluralRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedPluralRule")
            .field("categories", &self.categories)
            .finish_non_exhaustive()
    }
}

impl PluralRule for FixedPluralRule {
    fn categories(&self) -> &[PluralCategory] {
        &self.categories
    }

    fn bucket_for(&self, count: u64) -> PluralBucket {
        let last = self.categories.len().saturating_sub(1);
        PluralBucket::new((self.selector)(count).min(last))
    }
}

/// Provider backed by an explicit table, keyed by language code.
///
/// Lookups try the full normalized code first (`pt-BR`), then the bare
/// language (`pt`).
#[derive(Debug, Clone, Default)]
pub struct FixedPluralRules {
    rules: HashMap<String, Arc<FixedPluralRule>>,
}

impl FixedPluralRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, locale: &str, rule: FixedPluralRule) -> Self {
        self.insert(locale, rule);
        self
    }

    pub fn insert(&mut self, locale: &str, rule: FixedPluralRule) {
        self.rules.insert(normalize_locale(locale), Arc::new(rule));
    }
}

impl PluralRuleProvider for FixedPluralRules {
    fn rule_for(&self, locale: &str) -> Result<Arc<dyn PluralRule>, ParseErrorKind> {
        let normalized = normalize_locale(locale);
        let language = normalized.split('-').next().unwrap_or(&normalized);
        self.rules
            .get(&normalized)
            .or_else(|| self.rules.get(language))
            .map(|rule| Arc::clone(rule) as Arc<dyn PluralRule>)
            .ok_or_else(|| ParseErrorKind::UnsupportedLocale(locale.to_string()))
    }
}

/// Linguist's own form tables where they differ from CLDR, CLDR elsewhere.
///
/// Linguist fixes the number and order of numerus forms per language, and
/// `.ts` files written by its tools follow that layout. For Macedonian,
/// Latvian, Irish, Maltese and Welsh the CLDR integer categories give a
/// different count or order, so those come from an explicit table.
/// （Linguist 複數形式表，其他語言使用 CLDR 規則。）
#[derive(Debug, Clone)]
pub struct LinguistPluralRules {
    table: FixedPluralRules,
    cldr: IcuPluralRules,
}

impl LinguistPluralRules {
    pub fn new() -> Self {
        use PluralCategory::{Few, Many, One, Other, Two, Zero};

        let table = FixedPluralRules::new()
            .with_rule("mk", FixedPluralRule::new(vec![One, Two, Other], macedonian))
            // singular, plural, nullar
            .with_rule("lv", FixedPluralRule::new(vec![One, Other, Zero], latvian))
            .with_rule("ga", FixedPluralRule::new(vec![One, Two, Other], irish))
            .with_rule("mt", FixedPluralRule::new(vec![One, Few, Many, Other], maltese))
            .with_rule("cy", FixedPluralRule::new(vec![Zero, One, Two, Many, Other], welsh));
        Self {
            table,
            cldr: IcuPluralRules::new(),
        }
    }
}

impl Default for LinguistPluralRules {
    fn default() -> Self {
        Self::new()
    }
}

impl PluralRuleProvider for LinguistPluralRules {
    fn rule_for(&self, locale: &str) -> Result<Arc<dyn PluralRule>, ParseErrorKind> {
        self.table
            .rule_for(locale)
            .or_else(|_| self.cldr.rule_for(locale))
    }
}

fn macedonian(count: u64) -> usize {
    match count % 10 {
        1 => 0,
        2 => 1,
        _ => 2,
    }
}

fn latvian(count: u64) -> usize {
    if count % 10 == 1 && count % 100 != 11 {
        0
    } else if count != 0 {
        1
    } else {
        2
    }
}

fn irish(count: u64) -> usize {
    match count {
        1 => 0,
        2 => 1,
        _ => 2,
    }
}

fn maltese(count: u64) -> usize {
    match (count, count % 100) {
        (1, _) => 0,
        (0, _) | (_, 1..=10) => 1,
        (_, 11..=19) => 2,
        _ => 3,
    }
}

fn welsh(count: u64) -> usize {
    match count {
        0 => 0,
        1 => 1,
        2..=5 => 2,
        6 => 3,
        _ => 4,
    }
}
