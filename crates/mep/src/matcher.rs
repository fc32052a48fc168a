use std::{cmp::Ordering, collections::HashMap, fmt, str::FromStr};

use regex::Regex;
use tracing::{debug, warn};

use interface::{BondPair, Quote, QuoteTable};

/// 페소/달러 채권을 구분하는 종목 코드 규칙.
/// 페소: `^AL\d+$`, 달러: `^AL\d+D$` (기본값)
#[derive(Debug, Clone)]
pub struct TickerRules {
    prefix: String,
    dollar_suffix: char,
    peso: Regex,
    dollar: Regex,
}

impl TickerRules {
    pub fn new(prefix: &str, dollar_suffix: char) -> Result<Self, regex::Error> {
        let prefix = prefix.to_uppercase();
        let dollar_suffix = dollar_suffix.to_ascii_uppercase();
        let escaped = regex::escape(&prefix);
        let suffix = regex::escape(&dollar_suffix.to_string());
        Ok(Self {
            peso: Regex::new(&format!(r"^{escaped}(\d+)$"))?,
            dollar: Regex::new(&format!(r"^{escaped}(\d+){suffix}$"))?,
            prefix,
            dollar_suffix,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn dollar_suffix(&self) -> char {
        self.dollar_suffix
    }

    pub fn is_peso(&self, symbol: &str) -> bool {
        self.peso.is_match(&symbol.to_uppercase())
    }

    pub fn is_dollar(&self, symbol: &str) -> bool {
        self.dollar.is_match(&symbol.to_uppercase())
    }

    /// 접두어 뒤의 숫자 부분 (예: "AL30" -> "30", "AL30D" -> "30")
    pub fn identifier(&self, symbol: &str) -> Option<String> {
        let symbol = symbol.to_uppercase();
        self.peso
            .captures(&symbol)
            .or_else(|| self.dollar.captures(&symbol))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl Default for TickerRules {
    #[allow(clippy::expect_used)] // 고정 패턴이라 실패하지 않는다
    fn default() -> Self {
        Self::new("AL", 'D').expect("default ticker rules")
    }
}

/// 같은 번호의 달러 채권이 여러 개일 때 고르는 방법
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DollarMatchPolicy {
    /// 달러 표에서 먼저 나온 것. 결과가 표 순서에 의존한다
    #[default]
    FirstListed,
    /// 달러 쪽 거래량이 가장 큰 것, 같으면 먼저 나온 것
    MostTraded,
    /// 후보가 둘 이상이면 그 번호는 건너뛴다
    Strict,
}

impl fmt::Display for DollarMatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DollarMatchPolicy::FirstListed => "first",
            DollarMatchPolicy::MostTraded => "most-traded",
            DollarMatchPolicy::Strict => "strict",
        };
        f.write_str(s)
    }
}

impl FromStr for DollarMatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" | "first-listed" => Ok(DollarMatchPolicy::FirstListed),
            "most-traded" | "volume" => Ok(DollarMatchPolicy::MostTraded),
            "strict" => Ok(DollarMatchPolicy::Strict),
            other => Err(format!("unknown match policy: {other}")),
        }
    }
}

/// MEP 계산 후보: 가격이 양수인 페소 채권과 달러 채권
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub pesos: QuoteTable,
    pub dollars: QuoteTable,
}

fn has_positive_last(q: &Quote) -> bool {
    q.last.map(|p| p > 0.0).unwrap_or(false)
}

/// 시세표를 페소/달러 후보로 나눈다. 종목 코드는 대문자로 맞춘다.
pub fn partition(table: &QuoteTable, rules: &TickerRules) -> Candidates {
    let mut out = Candidates::default();
    for quote in table {
        if !has_positive_last(quote) {
            continue;
        }
        let symbol = quote.symbol.to_uppercase();
        if rules.is_peso(&symbol) {
            out.pesos.push(Quote {
                symbol,
                ..quote.clone()
            });
        } else if rules.is_dollar(&symbol) {
            out.dollars.push(Quote {
                symbol,
                ..quote.clone()
            });
        }
    }
    debug!(
        "후보 분류: 페소 {}개, 달러 {}개",
        out.pesos.len(),
        out.dollars.len()
    );
    out
}

/// 페소 채권마다 같은 번호의 달러 채권을 하나 붙인다.
/// 짝이 없는 페소 채권은 조용히 빠진다. 결과는 번호 오름차순.
pub fn pair(
    candidates: &Candidates,
    rules: &TickerRules,
    policy: DollarMatchPolicy,
) -> Vec<BondPair> {
    let mut by_id: HashMap<String, Vec<&Quote>> = HashMap::new();
    for dollar in &candidates.dollars {
        if let Some(id) = rules.identifier(&dollar.symbol) {
            by_id.entry(id).or_default().push(dollar);
        }
    }

    let mut pairs = Vec::new();
    for peso in &candidates.pesos {
        let Some(id) = rules.identifier(&peso.symbol) else {
            continue;
        };
        let Some(options) = by_id.get(&id) else {
            debug!("{}: 달러 채권 없음", peso.symbol);
            continue;
        };

        let chosen = match policy {
            DollarMatchPolicy::FirstListed => options.first().copied(),
            DollarMatchPolicy::MostTraded => most_traded(options),
            DollarMatchPolicy::Strict if options.len() > 1 => {
                warn!(
                    "{}: 달러 채권 후보 {}개, strict 정책으로 제외",
                    peso.symbol,
                    options.len()
                );
                None
            }
            DollarMatchPolicy::Strict => options.first().copied(),
        };

        if let Some(pair) =
            chosen.and_then(|dollar| BondPair::new(id.clone(), peso.clone(), dollar.clone()))
        {
            pairs.push(pair);
        }
    }

    // 안정 정렬: 같은 번호면 페소 표 순서 유지
    pairs.sort_by(|a, b| compare_ids(a.id(), b.id()));
    pairs
}

fn most_traded<'a>(options: &[&'a Quote]) -> Option<&'a Quote> {
    let mut best: Option<&'a Quote> = None;
    for q in options {
        let better = match best {
            None => true,
            Some(b) => match (q.volume, b.volume) {
                (Some(v), Some(bv)) => v > bv,
                (Some(_), None) => true,
                _ => false,
            },
        };
        if better {
            best = Some(*q);
        }
    }
    best
}

/// 숫자 문자열을 수 크기로 비교 (앞자리 0 무시)
fn compare_ids(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, last: Option<f64>) -> Quote {
        Quote {
            last,
            ..Quote::new(symbol)
        }
    }

    fn with_volume(symbol: &str, last: f64, volume: Option<f64>) -> Quote {
        Quote {
            last: Some(last),
            volume,
            ..Quote::new(symbol)
        }
    }

    #[test]
    fn test_ticker_rules() {
        let rules = TickerRules::default();
        assert!(rules.is_peso("AL30"));
        assert!(rules.is_peso("al30"));
        assert!(!rules.is_peso("AL30D"));
        assert!(!rules.is_peso("AL30C"));
        assert!(!rules.is_peso("GD30"));
        assert!(rules.is_dollar("AL30D"));
        assert!(!rules.is_dollar("AL30DD"));
        assert!(!rules.is_dollar("AL30C"));
        assert_eq!(rules.identifier("AL30"), Some("30".to_string()));
        assert_eq!(rules.identifier("AL35D"), Some("35".to_string()));
        assert_eq!(rules.identifier("GD30D"), None);
    }

    #[test]
    fn test_custom_prefix() {
        let rules = TickerRules::new("gd", 'd').unwrap();
        assert_eq!(rules.prefix(), "GD");
        assert_eq!(rules.dollar_suffix(), 'D');
        assert!(rules.is_peso("GD30"));
        assert!(rules.is_dollar("GD30D"));
        assert!(!rules.is_peso("AL30"));
    }

    #[test]
    fn test_partition_excludes_non_positive_prices() {
        let table = vec![
            quote("AL30", Some(65.0)),
            quote("AL29", Some(0.0)),
            quote("AL35", None),
            quote("al41", Some(-1.0)),
            quote("AL30D", Some(0.065)),
            quote("AL29D", Some(0.0)),
            quote("GD30", Some(70.0)),
        ];
        let c = partition(&table, &TickerRules::default());

        assert_eq!(c.pesos.len(), 1);
        assert_eq!(c.dollars.len(), 1);
        for q in c.pesos.iter().chain(c.dollars.iter()) {
            assert!(q.last.unwrap() > 0.0);
        }
    }

    #[test]
    fn test_partition_uppercases_symbols() {
        let c = partition(&vec![quote("al30d", Some(0.06))], &TickerRules::default());
        assert_eq!(c.dollars[0].symbol, "AL30D");
    }

    #[test]
    fn test_unmatched_peso_is_dropped() {
        let table = vec![
            quote("AL30", Some(65.0)),
            quote("AL35", Some(70.0)),
            quote("AL30D", Some(0.065)),
        ];
        let rules = TickerRules::default();
        let pairs = pair(&partition(&table, &rules), &rules, DollarMatchPolicy::FirstListed);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].peso().symbol, "AL30");
        assert_eq!(pairs[0].dollar().symbol, "AL30D");
        assert_eq!(pairs[0].id(), "30");
    }

    #[test]
    fn test_one_pair_per_peso_row_with_first_listed() {
        let candidates = Candidates {
            pesos: vec![quote("AL30", Some(65.0)), quote("AL30", Some(66.0))],
            dollars: vec![
                with_volume("AL30D", 0.065, Some(1.0)),
                with_volume("AL30D", 0.066, Some(9.0)),
            ],
        };
        let rules = TickerRules::default();
        let pairs = pair(&candidates, &rules, DollarMatchPolicy::FirstListed);

        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.dollar_price() == 0.065));
        // 같은 번호는 페소 표 순서 유지
        assert_eq!(pairs[0].peso_price(), 65.0);
        assert_eq!(pairs[1].peso_price(), 66.0);
    }

    #[test]
    fn test_most_traded_and_strict_policies() {
        let candidates = Candidates {
            pesos: vec![quote("AL30", Some(65.0)), quote("AL35", Some(70.0))],
            dollars: vec![
                with_volume("AL30D", 0.065, None),
                with_volume("AL30D", 0.066, Some(9.0)),
                with_volume("AL30D", 0.067, Some(9.0)),
                with_volume("AL35D", 0.07, Some(1.0)),
            ],
        };
        let rules = TickerRules::default();

        let pairs = pair(&candidates, &rules, DollarMatchPolicy::MostTraded);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].dollar_price(), 0.066);

        let pairs = pair(&candidates, &rules, DollarMatchPolicy::Strict);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].id(), "35");
    }

    #[test]
    fn test_pairs_sorted_by_numeric_identifier() {
        let table = vec![
            quote("AL41", Some(80.0)),
            quote("AL9", Some(50.0)),
            quote("AL30", Some(65.0)),
            quote("AL30D", Some(0.065)),
            quote("AL9D", Some(0.05)),
            quote("AL41D", Some(0.08)),
        ];
        let rules = TickerRules::default();
        let pairs = pair(&partition(&table, &rules), &rules, DollarMatchPolicy::default());
        let ids: Vec<&str> = pairs.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["9", "30", "41"]);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("first".parse::<DollarMatchPolicy>(), Ok(DollarMatchPolicy::FirstListed));
        assert_eq!(
            "Most-Traded".parse::<DollarMatchPolicy>(),
            Ok(DollarMatchPolicy::MostTraded)
        );
        assert_eq!("strict".parse::<DollarMatchPolicy>(), Ok(DollarMatchPolicy::Strict));
        assert!("random".parse::<DollarMatchPolicy>().is_err());
        assert_eq!(DollarMatchPolicy::MostTraded.to_string(), "most-traded");
    }

    #[test]
    fn test_compare_ids() {
        assert_eq!(compare_ids("9", "30"), Ordering::Less);
        assert_eq!(compare_ids("030", "30"), Ordering::Less);
        assert_eq!(compare_ids("41", "35"), Ordering::Greater);
    }
}
