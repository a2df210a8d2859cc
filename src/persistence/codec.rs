//! String codecs for enum columns shared by the task and draft repos.

use crate::models::draft::Source;
use crate::models::task::{EnergyLevel, Frequency, Workspace};
use crate::{AppError, Result};

pub(crate) fn workspace_str(w: Workspace) -> &'static str {
    match w {
        Workspace::Primary => "primary",
        Workspace::Secondary => "secondary",
        Workspace::Personal => "personal",
    }
}

pub(crate) fn parse_workspace(s: &str) -> Result<Workspace> {
    match s {
        "primary" => Ok(Workspace::Primary),
        "secondary" => Ok(Workspace::Secondary),
        "personal" => Ok(Workspace::Personal),
        other => Err(AppError::Db(format!("invalid workspace: {other}"))),
    }
}

pub(crate) fn energy_str(e: EnergyLevel) -> &'static str {
    match e {
        EnergyLevel::High => "high",
        EnergyLevel::Medium => "medium",
        EnergyLevel::Low => "low",
    }
}

pub(crate) fn parse_energy(s: &str) -> Result<EnergyLevel> {
    match s {
        "high" => Ok(EnergyLevel::High),
        "medium" => Ok(EnergyLevel::Medium),
        "low" => Ok(EnergyLevel::Low),
        other => Err(AppError::Db(format!("invalid energy: {other}"))),
    }
}

pub(crate) fn source_str(s: Source) -> &'static str {
    match s {
        Source::Email => "email",
        Source::ChatMention => "chat_mention",
        Source::BotMessage => "bot_message",
    }
}

pub(crate) fn parse_source(s: &str) -> Result<Source> {
    match s {
        "email" => Ok(Source::Email),
        "chat_mention" => Ok(Source::ChatMention),
        "bot_message" => Ok(Source::BotMessage),
        other => Err(AppError::Db(format!("invalid source: {other}"))),
    }
}

pub(crate) fn frequency_str(f: Frequency) -> &'static str {
    match f {
        Frequency::Day => "day",
        Frequency::Week => "week",
        Frequency::Month => "month",
    }
}

pub(crate) fn parse_frequency(s: &str) -> Result<Frequency> {
    match s {
        "day" => Ok(Frequency::Day),
        "week" => Ok(Frequency::Week),
        "month" => Ok(Frequency::Month),
        other => Err(AppError::Db(format!("invalid frequency: {other}"))),
    }
}

pub(crate) fn parse_timestamp(s: &str, column: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| AppError::Db(format!("invalid {column}: {e}")))
}

pub(crate) fn parse_opt_timestamp(
    s: Option<&str>,
    column: &str,
) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    s.map(|v| parse_timestamp(v, column)).transpose()
}

pub(crate) fn encode_string_list(list: &[String]) -> Result<String> {
    serde_json::to_string(list).map_err(|e| AppError::Db(format!("invalid string list: {e}")))
}

pub(crate) fn parse_string_list(raw: &str, column: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| AppError::Db(format!("invalid {column}: {e}")))
}

pub(crate) fn parse_opt_minutes(raw: Option<i64>, column: &str) -> Result<Option<u32>> {
    raw.map(|v| u32::try_from(v).map_err(|e| AppError::Db(format!("invalid {column}: {e}"))))
        .transpose()
}
