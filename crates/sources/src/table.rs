use serde_json::Value;

use interface::FetchError;

/// 정규화 전의 원본 표. 셀은 JSON 값 그대로 (HTML 셀은 문자열).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// JSON 객체 배열을 표로 바꾼다.
    /// 컬럼은 처음 등장한 순서대로 모든 키의 합집합, 없는 키는 null.
    pub fn from_records(records: &[Value]) -> Result<Self, FetchError> {
        let mut columns: Vec<String> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let obj = record.as_object().ok_or_else(|| {
                FetchError::Unparseable(format!(
                    "record {} of {} is not an object: {}",
                    i,
                    records.len(),
                    record.to_string().chars().take(200).collect::<String>()
                ))
            })?;
            for key in obj.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                columns
                    .iter()
                    .map(|c| obj.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// (행 수, 열 수)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
