//! Hand-assembles response XML. The tag shapes in §6 are fixed, tiny and
//! attribute-order-sensitive fragments — a generic serializer would fight the
//! format more than help, so this mirrors the source's own `fmt.Sprintf` assembly.

use std::fmt::Write as _;

use engine::{CommandResult, ExecutedEntry};

pub fn render_results(results: &[CommandResult]) -> String {
    let mut out = String::from("<results>");
    for result in results {
        render_result(&mut out, result);
    }
    out.push_str("</results>");
    out
}

pub fn render_rejected(message: &str) -> String {
    format!("<results><error>{}</error></results>", escape(message))
}

fn render_result(out: &mut String, result: &CommandResult) {
    match result {
        CommandResult::Created { uid } => {
            let _ = write!(out, "<created id=\"{}\"/>", escape(uid));
        }
        CommandResult::CreateError { uid, message } => {
            let _ = write!(out, "<error id=\"{}\">{}</error>", escape(uid), escape(message));
        }
        CommandResult::PositionCreated { symbol, uid } => {
            let _ = write!(out, "<created sym=\"{}\" id=\"{}\"/>", escape(symbol), escape(uid));
        }
        CommandResult::PositionError { symbol, uid, message } => {
            let _ = write!(
                out,
                "<error sym=\"{}\" id=\"{}\">{}</error>",
                escape(symbol),
                escape(uid),
                escape(message)
            );
        }
        CommandResult::Opened { symbol, signed_amount, limit_price, order_id } => {
            let _ = write!(
                out,
                "<opened sym=\"{}\" Amount=\"{}\" limit=\"{}\" id=\"{}\"/>",
                escape(symbol),
                signed_amount,
                limit_price,
                order_id
            );
        }
        CommandResult::OrderError { symbol, signed_amount, limit_price, message } => {
            let _ = write!(
                out,
                "<error sym=\"{}\" Amount=\"{}\" limit=\"{}\">{}</error>",
                escape(symbol),
                signed_amount,
                limit_price,
                escape(message)
            );
        }
        CommandResult::Canceled { order_id, remaining, time, executed } => {
            let _ = write!(out, "<canceled id=\"{order_id}\">");
            let _ = write!(out, "<canceled shares=\"-{remaining}\" time=\"{}\"/>", escape(time));
            render_executed(out, executed);
            out.push_str("</canceled>");
        }
        CommandResult::CancelError { order_id, message } => {
            let _ = write!(out, "<error id=\"{order_id}\">{}</error>", escape(message));
        }
        CommandResult::Status { order_id, open_signed_amount, cancel, executed } => {
            let _ = write!(out, "<status id=\"{order_id}\">");
            if let Some(shares) = open_signed_amount {
                let _ = write!(out, "<opened shares=\"{shares}\"/>");
            }
            if let Some((shares, time)) = cancel {
                let _ = write!(out, "<canceled shares=\"{shares}\" time=\"{}\"/>", escape(time));
            }
            render_executed(out, executed);
            out.push_str("</status>");
        }
        CommandResult::StatusError { order_id, message } => {
            let _ = write!(out, "<error id=\"{order_id}\">{}</error>", escape(message));
        }
    }
}

fn render_executed(out: &mut String, executed: &[ExecutedEntry]) {
    for entry in executed {
        let _ = write!(
            out,
            "<executed shares=\"{}\" price=\"{}\" time=\"{}\"/>",
            entry.signed_amount,
            entry.price,
            escape(&entry.time)
        );
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
