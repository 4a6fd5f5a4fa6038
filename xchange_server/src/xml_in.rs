//! Parses one request payload into a batch of `engine::Command`s. A request whose
//! root is neither `create` nor `transactions`, or which contains any unrecognized
//! or malformed element, is rejected wholesale — nothing in the batch is applied.

use std::collections::HashMap;
use std::str::FromStr;

use engine::Command;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_decimal::Decimal;

pub fn parse_request(xml: &[u8]) -> Result<Vec<Command>, String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::Eof => return Err("empty request".to_string()),
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                let attrs = attrs_of(&e)?;
                return match name.as_slice() {
                    b"create" => parse_create(&mut reader),
                    b"transactions" => {
                        let uid = attrs
                            .get("id")
                            .cloned()
                            .ok_or_else(|| "transactions missing id".to_string())?;
                        parse_transactions(&mut reader, &uid)
                    }
                    other => Err(format!("unrecognized root element: {}", String::from_utf8_lossy(other))),
                };
            }
            Event::Empty(e) => {
                let name = e.name().as_ref().to_vec();
                return match name.as_slice() {
                    b"create" | b"transactions" => Ok(Vec::new()),
                    other => Err(format!("unrecognized root element: {}", String::from_utf8_lossy(other))),
                };
            }
            _ => {}
        }
    }
}

fn attrs_of(e: &BytesStart) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| e.to_string())?
            .to_string();
        map.insert(key, value);
    }
    Ok(map)
}

fn parse_decimal(attrs: &HashMap<String, String>, field: &str) -> Result<Decimal, String> {
    let raw = attrs.get(field).ok_or_else(|| format!("missing {field}"))?;
    Decimal::from_str(raw).map_err(|e| format!("bad {field} value {raw:?}: {e}"))
}

fn parse_u64(attrs: &HashMap<String, String>, field: &str) -> Result<u64, String> {
    let raw = attrs.get(field).ok_or_else(|| format!("missing {field}"))?;
    raw.parse::<u64>().map_err(|e| format!("bad {field} value {raw:?}: {e}"))
}

fn parse_create(reader: &mut Reader<&[u8]>) -> Result<Vec<Command>, String> {
    let mut buf = Vec::new();
    let mut commands = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::End(e) if e.name().as_ref() == b"create" => return Ok(commands),
            Event::Eof => return Err("unterminated create block".to_string()),
            Event::Empty(e) if e.name().as_ref() == b"account" => {
                let attrs = attrs_of(&e)?;
                let uid = attrs.get("id").cloned().ok_or("account missing id")?;
                let balance = parse_decimal(&attrs, "balance")?;
                commands.push(Command::CreateAccount { uid, balance });
            }
            Event::Start(e) if e.name().as_ref() == b"symbol" => {
                let attrs = attrs_of(&e)?;
                let symbol = attrs.get("sym").cloned().ok_or("symbol missing sym")?;
                parse_symbol_accounts(reader, &symbol, &mut commands)?;
            }
            Event::Start(e) if e.name().as_ref() == b"account" => {
                return Err(format!(
                    "unexpected account element shape: {}",
                    String::from_utf8_lossy(e.name().as_ref())
                ));
            }
            Event::Start(e) | Event::Empty(e) => {
                return Err(format!(
                    "unrecognized element in create: {}",
                    String::from_utf8_lossy(e.name().as_ref())
                ))
            }
            _ => {}
        }
    }
}

fn parse_symbol_accounts(
    reader: &mut Reader<&[u8]>,
    symbol: &str,
    commands: &mut Vec<Command>,
) -> Result<(), String> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::End(e) if e.name().as_ref() == b"symbol" => return Ok(()),
            Event::Eof => return Err("unterminated symbol block".to_string()),
            Event::Start(e) if e.name().as_ref() == b"account" => {
                let attrs = attrs_of(&e)?;
                let uid = attrs.get("id").cloned().ok_or("account missing id")?;
                let amount_text = read_text_until_end(reader, b"account")?;
                let amount = Decimal::from_str(amount_text.trim())
                    .map_err(|e| format!("bad position amount {amount_text:?}: {e}"))?;
                commands.push(Command::SeedPosition {
                    uid,
                    symbol: symbol.to_string(),
                    amount,
                });
            }
            Event::Start(e) | Event::Empty(e) => {
                return Err(format!(
                    "unrecognized element in symbol: {}",
                    String::from_utf8_lossy(e.name().as_ref())
                ))
            }
            _ => {}
        }
    }
}

fn read_text_until_end(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<String, String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::Text(t) => {
                text.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::End(e) if e.name().as_ref() == tag => return Ok(text),
            Event::Eof => return Err("unterminated element".to_string()),
            _ => {}
        }
    }
}

fn parse_transactions(reader: &mut Reader<&[u8]>, uid: &str) -> Result<Vec<Command>, String> {
    let mut buf = Vec::new();
    let mut commands = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::End(e) if e.name().as_ref() == b"transactions" => return Ok(commands),
            Event::Eof => return Err("unterminated transactions block".to_string()),
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name().as_ref().to_vec();
                let attrs = attrs_of(&e)?;
                match name.as_slice() {
                    b"order" => {
                        let symbol = attrs.get("sym").cloned().ok_or("order missing sym")?;
                        let amount = parse_decimal(&attrs, "amount")?;
                        if amount == Decimal::ZERO {
                            return Err("order amount must be nonzero".to_string());
                        }
                        let limit_price = parse_decimal(&attrs, "limit")?;
                        commands.push(Command::SubmitOrder {
                            uid: uid.to_string(),
                            symbol,
                            amount,
                            limit_price,
                        });
                    }
                    b"query" => {
                        let order_id = parse_u64(&attrs, "id")?;
                        commands.push(Command::Query { order_id });
                    }
                    b"cancel" => {
                        let order_id = parse_u64(&attrs, "id")?;
                        commands.push(Command::Cancel { order_id });
                    }
                    other => {
                        return Err(format!(
                            "unrecognized element in transactions: {}",
                            String::from_utf8_lossy(other)
                        ))
                    }
                }
            }
            _ => {}
        }
    }
}
