//! Conversion status codecs.
//!
//! Older generations deliver a tagged variant, `{"Confirmed": {"txid": [..]}}`.
//! The newest one delivers text such as `Confirmed { txid: ab12 }`. Decoding
//! is total in both cases: anything that cannot be classified, or whose
//! payload is missing or invalid, becomes [`ConversionStatus::Unknown`].

use serde_json::{json, Map};

use super::WireValue;
use crate::types::{Account, ConversionStatus, ReimbursementDeposit, ReimbursementReason, Txid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Pending,
    Signing,
    Submitted,
    Sending,
    Confirmed,
    AmountTooLow,
    WillReimburse,
    Reimbursed,
    Unknown,
}

impl Tag {
    const ALL: [Tag; 9] = [
        Tag::Pending,
        Tag::Signing,
        Tag::Submitted,
        Tag::Sending,
        Tag::Confirmed,
        Tag::AmountTooLow,
        Tag::WillReimburse,
        Tag::Reimbursed,
        Tag::Unknown,
    ];

    fn name(self) -> &'static str {
        match self {
            Tag::Pending => "Pending",
            Tag::Signing => "Signing",
            Tag::Submitted => "Submitted",
            Tag::Sending => "Sending",
            Tag::Confirmed => "Confirmed",
            Tag::AmountTooLow => "AmountTooLow",
            Tag::WillReimburse => "WillReimburse",
            Tag::Reimbursed => "Reimbursed",
            Tag::Unknown => "Unknown",
        }
    }

    /// Case-insensitive, ignoring `_` so `amount_too_low` matches too.
    fn parse(text: &str) -> Option<Tag> {
        let wanted: String = text
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|tag| tag.name().to_lowercase() == wanted)
    }
}

/// Flat key/value view over either payload form.
trait Fields {
    fn text(&self, key: &str) -> Option<String>;
    fn txid(&self, key: &str) -> Option<Txid>;
    fn bytes(&self, key: &str) -> Option<Option<Vec<u8>>>;
    fn number(&self, key: &str) -> Option<u64>;
    fn reason(&self) -> Option<ReimbursementReason>;
}

fn build(tag: Tag, fields: &dyn Fields) -> Option<ConversionStatus> {
    let deposit = || -> Option<ReimbursementDeposit> {
        Some(ReimbursementDeposit {
            account: Account {
                owner: fields.text("owner")?,
                subaccount: fields.bytes("subaccount")?,
            },
            mint_block_index: fields.number("mint_block_index")?,
            amount: fields.number("amount")?,
            reason: fields.reason()?,
        })
    };
    Some(match tag {
        Tag::Pending => ConversionStatus::Pending,
        Tag::Signing => ConversionStatus::Signing,
        Tag::Submitted => ConversionStatus::Submitted {
            txid: fields.txid("txid")?,
        },
        Tag::Sending => ConversionStatus::Sending {
            txid: fields.txid("txid")?,
        },
        Tag::Confirmed => ConversionStatus::Confirmed {
            txid: fields.txid("txid")?,
        },
        Tag::AmountTooLow => ConversionStatus::AmountTooLow,
        Tag::WillReimburse => ConversionStatus::WillReimburse(deposit()?),
        Tag::Reimbursed => ConversionStatus::Reimbursed(deposit()?),
        Tag::Unknown => ConversionStatus::Unknown,
    })
}

fn txid_from_text(text: &str) -> Option<Txid> {
    let text = text.trim();
    if let Some(list) = text.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        let bytes = list
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| item.parse::<u8>().ok())
            .collect::<Option<Vec<u8>>>()?;
        return (!bytes.is_empty()).then(|| Txid::new(bytes));
    }
    if text.is_empty() {
        return None;
    }
    Txid::from_hex(text)
}

// ---------------------------------------------------------------------------
// Structured form
// ---------------------------------------------------------------------------

/// Tagged-variant rendering used by the older generations.
pub(super) fn encode_structured(status: &ConversionStatus) -> WireValue {
    let payload = match status {
        ConversionStatus::Submitted { txid }
        | ConversionStatus::Sending { txid }
        | ConversionStatus::Confirmed { txid } => json!({ "txid": txid.as_bytes() }),
        ConversionStatus::WillReimburse(deposit) | ConversionStatus::Reimbursed(deposit) => {
            let reason = match &deposit.reason {
                ReimbursementReason::CallFailed => json!({ "CallFailed": null }),
                ReimbursementReason::TaintedDestination {
                    kyt_fee,
                    kyt_provider,
                } => json!({
                    "TaintedDestination": { "kyt_fee": kyt_fee, "kyt_provider": kyt_provider }
                }),
            };
            json!({
                "account": {
                    "owner": deposit.account.owner,
                    "subaccount": deposit.account.subaccount,
                },
                "mint_block_index": deposit.mint_block_index,
                "amount": deposit.amount,
                "reason": reason,
            })
        }
        _ => WireValue::Null,
    };
    let mut tagged = Map::new();
    tagged.insert(status.tag().to_string(), payload);
    WireValue::Object(tagged)
}

struct Structured<'a>(&'a WireValue);

impl Structured<'_> {
    fn get(&self, key: &str) -> Option<&WireValue> {
        self.0
            .get(key)
            .or_else(|| self.0.get("account").and_then(|account| account.get(key)))
            .filter(|value| !value.is_null())
    }
}

impl Fields for Structured<'_> {
    fn text(&self, key: &str) -> Option<String> {
        self.get(key)?.as_str().map(str::to_string)
    }

    fn txid(&self, key: &str) -> Option<Txid> {
        match self.get(key)? {
            WireValue::String(text) => txid_from_text(text),
            value => serde_json::from_value::<Vec<u8>>(value.clone())
                .ok()
                .filter(|bytes| !bytes.is_empty())
                .map(Txid::new),
        }
    }

    fn bytes(&self, key: &str) -> Option<Option<Vec<u8>>> {
        match self.get(key) {
            None => Some(None),
            Some(WireValue::String(text)) => hex::decode(text).ok().map(Some),
            Some(value) => serde_json::from_value::<Vec<u8>>(value.clone()).ok().map(Some),
        }
    }

    fn number(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            WireValue::String(text) => text.trim().parse().ok(),
            value => value.as_u64(),
        }
    }

    fn reason(&self) -> Option<ReimbursementReason> {
        match self.get("reason")? {
            WireValue::String(text) => match ReasonTag::parse(text)? {
                ReasonTag::CallFailed => Some(ReimbursementReason::CallFailed),
                ReasonTag::TaintedDestination => Some(ReimbursementReason::TaintedDestination {
                    kyt_fee: self.number("kyt_fee")?,
                    kyt_provider: self.text("kyt_provider")?,
                }),
            },
            WireValue::Object(map) if map.len() == 1 => {
                let (name, payload) = map.iter().next()?;
                match ReasonTag::parse(name)? {
                    ReasonTag::CallFailed => Some(ReimbursementReason::CallFailed),
                    ReasonTag::TaintedDestination => {
                        let payload = Structured(payload);
                        Some(ReimbursementReason::TaintedDestination {
                            kyt_fee: payload.number("kyt_fee")?,
                            kyt_provider: payload.text("kyt_provider")?,
                        })
                    }
                }
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReasonTag {
    CallFailed,
    TaintedDestination,
}

impl ReasonTag {
    fn parse(text: &str) -> Option<ReasonTag> {
        let wanted: String = text
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match wanted.as_str() {
            "callfailed" => Some(ReasonTag::CallFailed),
            "tainteddestination" => Some(ReasonTag::TaintedDestination),
            _ => None,
        }
    }
}

/// Decode any wire status. Text is routed to the text decoder.
pub(super) fn decode(wire: &WireValue) -> ConversionStatus {
    match wire {
        WireValue::String(text) => decode_status_text(text),
        WireValue::Object(map) if map.len() == 1 => {
            let Some((name, payload)) = map.iter().next() else {
                return ConversionStatus::Unknown;
            };
            Tag::parse(name)
                .and_then(|tag| build(tag, &Structured(payload)))
                .unwrap_or(ConversionStatus::Unknown)
        }
        _ => ConversionStatus::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Text form
// ---------------------------------------------------------------------------

/// Render a status as text, e.g. `Sending { txid: ab12 }`.
pub fn encode_status_text(status: &ConversionStatus) -> String {
    let mut fields: Vec<(&str, String)> = Vec::new();
    if let Some(txid) = status.txid() {
        fields.push(("txid", txid.to_hex()));
    }
    if let Some(deposit) = status.reimbursement() {
        fields.push(("owner", deposit.account.owner.clone()));
        if let Some(subaccount) = &deposit.account.subaccount {
            fields.push(("subaccount", hex::encode(subaccount)));
        }
        fields.push(("mint_block_index", deposit.mint_block_index.to_string()));
        fields.push(("amount", deposit.amount.to_string()));
        match &deposit.reason {
            ReimbursementReason::CallFailed => fields.push(("reason", "CallFailed".to_string())),
            ReimbursementReason::TaintedDestination {
                kyt_fee,
                kyt_provider,
            } => {
                fields.push(("reason", "TaintedDestination".to_string()));
                fields.push(("kyt_fee", kyt_fee.to_string()));
                fields.push(("kyt_provider", kyt_provider.clone()));
            }
        }
    }
    if fields.is_empty() {
        return status.tag().to_string();
    }
    let body = fields
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} {{ {body} }}", status.tag())
}

struct TextFields(Vec<(String, String)>);

impl TextFields {
    /// Split `k: v, k: v`. Bracketed byte lists keep their commas.
    fn parse(body: &str) -> Self {
        let mut items = Vec::new();
        let mut depth = 0usize;
        let mut current = String::new();
        for c in body.chars() {
            match c {
                '[' | '(' => {
                    depth += 1;
                    current.push(c);
                }
                ']' | ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => items.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        items.push(current);

        let pairs = items
            .iter()
            .filter_map(|item| {
                let (key, value) = item.split_once(|c: char| c == ':' || c == '=')?;
                let value = value.trim().trim_matches('"').to_string();
                Some((key.trim().to_lowercase(), value))
            })
            .collect();
        Self(pairs)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

impl Fields for TextFields {
    fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn txid(&self, key: &str) -> Option<Txid> {
        txid_from_text(self.get(key)?)
    }

    fn bytes(&self, key: &str) -> Option<Option<Vec<u8>>> {
        match self.get(key) {
            None => Some(None),
            Some(text) => hex::decode(text).ok().map(Some),
        }
    }

    fn number(&self, key: &str) -> Option<u64> {
        self.get(key)?.parse().ok()
    }

    fn reason(&self) -> Option<ReimbursementReason> {
        match ReasonTag::parse(self.get("reason")?)? {
            ReasonTag::CallFailed => Some(ReimbursementReason::CallFailed),
            ReasonTag::TaintedDestination => Some(ReimbursementReason::TaintedDestination {
                kyt_fee: self.number("kyt_fee")?,
                kyt_provider: self.text("kyt_provider")?,
            }),
        }
    }
}

/// Best-effort classification of a textual status.
///
/// The leading identifier selects the variant; `key: value` pairs inside the
/// following braces or parentheses supply the payload. Never fails.
pub fn decode_status_text(text: &str) -> ConversionStatus {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    let (name, rest) = text.split_at(split);
    let Some(tag) = Tag::parse(name) else {
        return ConversionStatus::Unknown;
    };

    let rest = rest.trim();
    let body = rest
        .strip_prefix(|c: char| c == '{' || c == '(')
        .map(|inner| inner.trim_end().trim_end_matches(|c: char| c == '}' || c == ')'))
        .unwrap_or(rest);
    build(tag, &TextFields::parse(body)).unwrap_or(ConversionStatus::Unknown)
}
