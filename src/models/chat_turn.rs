use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};

/// 一轮已完成的问答
///
/// 在回复生成之后由调用方创建，创建后不可变，归 HistoryStore 所有。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    /// 提问者
    pub sender: String,
    /// 问题
    pub question: String,
    /// 机器人回复
    pub response: String,
    /// 本地时间，格式 `%Y-%m-%d %H:%M:%S`
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    /// 回答该问题的角色
    pub role: String,
}

impl ChatTurn {
    /// 以当前本地时间（精确到秒）创建新的问答记录
    pub fn new(sender: &str, question: &str, response: &str, role: &str) -> Self {
        let now = Local::now().naive_local().trunc_subsecs(0);
        Self::at(sender, question, response, role, now)
    }

    /// 以指定时间创建问答记录
    pub fn at(
        sender: &str,
        question: &str,
        response: &str,
        role: &str,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            sender: sender.to_string(),
            question: question.to_string(),
            response: response.to_string(),
            timestamp,
            role: role.to_string(),
        }
    }
}

/// 历史文件中的时间戳格式，精确到秒
mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_history_file_entry_format() {
        let timestamp = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        let turn = ChatTurn::at("张三", "今天天气", "晴", "@专业助手bot", timestamp);
        let json = serde_json::to_value(&turn).unwrap();

        assert_eq!(json["timestamp"], "2025-03-01 09:30:05");
        assert_eq!(json["sender"], "张三");
        assert_eq!(json["role"], "@专业助手bot");
    }

    #[test]
    fn test_rejects_malformed_timestamp() {
        let json = r#"{"sender":"a","question":"q","response":"r","timestamp":"yesterday","role":"R"}"#;
        assert!(serde_json::from_str::<ChatTurn>(json).is_err());
    }
}
