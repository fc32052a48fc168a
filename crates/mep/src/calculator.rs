use interface::{BondPair, MepError, MepRate, MepSummary};

/// 채권 쌍마다 MEP 환율 (페소 가격 / 달러 가격). 반올림하지 않는다.
pub fn rates(pairs: Vec<BondPair>) -> Vec<MepRate> {
    pairs.into_iter().map(MepRate::new).collect()
}

/// 평균/최소/최대. 비어 있으면 0 대신 에러.
pub fn summarize(rates: &[MepRate]) -> Result<MepSummary, MepError> {
    if rates.is_empty() {
        return Err(MepError::InsufficientData);
    }

    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for rate in rates {
        let r = rate.ratio();
        sum += r;
        min = min.min(r);
        max = max.max(r);

        // 달러 쪽 거래량으로 가중
        if let Some(w) = rate.pair().dollar().volume.filter(|w| *w > 0.0) {
            weighted_sum += r * w;
            total_weight += w;
        }
    }

    let count = rates.len();
    Ok(MepSummary {
        mean: sum / count as f64,
        min,
        max,
        count,
        volume_weighted: (total_weight > 0.0).then(|| weighted_sum / total_weight),
    })
}
