//! Daily report delivery over SMTP.

use core::{fmt::Write, time::Duration};

use chrono::NaiveDate;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};

use crate::{platform::Platform, report::ReportPayload};

const TARGET: &str = "mail";

const QUOTE: &str = "\"Success is the sum of small efforts repeated day in and day out.\"";

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub from: Option<String>,
    pub password: Option<String>,
    pub relay: String,
    pub timeout: Duration,
}

impl MailConfig {
    pub const DEFAULT_RELAY: &'static str = "smtp.gmail.com";
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: None,
            password: None,
            relay: Self::DEFAULT_RELAY.to_owned(),
            timeout: const { Duration::from_secs(30) },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
}

pub trait ReportSink {
    fn deliver(&self, to: &str, report: &ReportPayload) -> impl Future<Output = anyhow::Result<Delivery>> + Send;
}

pub fn subject(date: NaiveDate) -> String {
    format!("Your Daily Coding Report - {}", date.format("%b %d"))
}

/// Hex colour of a delta badge.
pub const fn delta_color(delta: u32) -> &'static str {
    match delta {
        5.. => "#10b981",
        1.. => "#3b82f6",
        0 => "#6b7280",
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_text(r: &ReportPayload) -> String {
    let mut s = format!(
        "Hi {} 👋,\n\n{}\n\n{}\n\n📊 Today's Coding Report for {}:\n\n🎯 TODAY'S TOTAL: {} problems solved!\n\n",
        r.name,
        r.badge,
        r.motivation,
        r.date.format("%B %d, %Y"),
        r.total_today,
    );
    for p in Platform::ALL {
        let _ = writeln!(
            s,
            "{} {p}: {} {} (+{} today)",
            p.emoji(),
            r.totals[p],
            p.unit().to_lowercase(),
            r.deltas[p],
        );
    }
    let _ = write!(s, "\n{QUOTE}\n\nKeep coding! ✨\n");
    s
}

fn stat_row(out: &mut String, platform: Platform, total: u32, delta: u32) {
    let color = delta_color(delta);
    let arrow = if delta > 0 { "📈" } else { "➖" };
    let _ = write!(
        out,
        r#"<tr><td style="padding-bottom:12px;"><table role="presentation" width="100%" style="background-color:#f9fafb;border-radius:8px;padding:16px;"><tr><td style="width:40%;"><p style="color:#374151;margin:0;font-size:16px;font-weight:600;">{} {platform}</p></td><td style="width:30%;text-align:right;"><p style="color:#6b7280;margin:0;font-size:14px;">{total} {}</p></td><td style="width:30%;text-align:right;"><span style="background-color:{color}20;color:{color};padding:4px 12px;border-radius:12px;font-size:14px;font-weight:600;">{arrow} +{delta}</span></td></tr></table></td></tr>"#,
        platform.emoji(),
        platform.unit(),
    );
}

pub fn render_html(r: &ReportPayload) -> String {
    let mut rows = String::new();
    for p in Platform::ALL {
        stat_row(&mut rows, p, r.totals[p], r.deltas[p]);
    }

    format!(
        r#"<!DOCTYPE html><html><body style="background:#f3f4f6;margin:0;padding:0;font-family:system-ui,-apple-system,Segoe UI,Roboto,Arial;">
<table role="presentation" width="100%" style="padding:20px 0;"><tr><td align="center">
<table role="presentation" width="600" style="max-width:600px;background:#fff;border-radius:16px;overflow:hidden;">
<tr><td style="background:linear-gradient(135deg,#667eea,#764ba2);padding:40px 30px;text-align:center;">
<h1 style="color:#fff;margin:0 0 10px;font-size:32px;font-weight:700;">🚀 Coding Report</h1>
<p style="color:#e0e7ff;margin:0;font-size:16px;">{date}</p>
<div style="margin-top:15px;padding:8px 16px;background:rgba(255,255,255,.2);border-radius:20px;display:inline-block;"><span style="color:#fff;font-weight:600;font-size:14px;">{badge}</span></div>
</td></tr>
<tr><td style="padding:30px;">
<h2 style="color:#1f2937;margin:0 0 10px;font-size:24px;">Hey {name}! 👋</h2>
<div style="background:linear-gradient(135deg,#fef3c7,#fde68a);border-left:4px solid #f59e0b;padding:20px;border-radius:12px;margin-bottom:20px;"><p style="margin:0;color:#92400e;font-size:16px;line-height:1.6;"><strong>💬 Coach says:</strong><br>{motivation}</p></div>
<div style="background:linear-gradient(135deg,#10b981,#059669);padding:20px;border-radius:12px;text-align:center;color:#fff;margin-bottom:20px;"><p style="margin:0 0 5px;font-size:14px;">Today's Total</p><p style="margin:0;font-size:36px;font-weight:700;">{total}</p><p style="margin:5px 0 0;font-size:14px;">Problems Solved 🎯</p></div>
<table role="presentation" width="100%">{rows}</table>
</td></tr>
<tr><td style="background:#f9fafb;padding:30px;text-align:center;border-top:1px solid #e5e7eb;"><p style="color:#6b7280;margin:0 0 10px;font-size:14px;">{quote}</p><p style="color:#9ca3af;margin:0;font-size:12px;">Happy coding! ✨</p></td></tr>
</table>
</td></tr></table></body></html>"#,
        date = r.date.format("%B %d, %Y"),
        badge = r.badge,
        name = escape(&r.name),
        motivation = escape(&r.motivation),
        total = r.total_today,
        quote = escape(QUOTE),
    )
}

pub fn compose(from: &str, to: &str, report: &ReportPayload) -> anyhow::Result<Message> {
    Ok(Message::builder()
        .from(from.parse::<Mailbox>()?)
        .to(to.parse::<Mailbox>()?)
        .subject(subject(report.date))
        .multipart(MultiPart::alternative_plain_html(render_text(report), render_html(report)))?)
}

/// STARTTLS SMTP sink. Without sender credentials every delivery is skipped.
pub struct Mailer {
    from: Option<String>,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let (Some(from), Some(password)) = (
            config.from.as_deref().filter(|s| !s.is_empty()),
            config.password.as_deref().filter(|s| !s.is_empty()),
        ) else {
            tracing::warn!(target: TARGET, "no sender credentials, reports will not be mailed");
            return Ok(Self { from: None, transport: None });
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.relay)?
            .credentials(Credentials::new(from.to_owned(), password.to_owned()))
            .timeout(Some(config.timeout))
            .build();
        Ok(Self {
            from: Some(from.to_owned()),
            transport: Some(transport),
        })
    }
}

impl ReportSink for Mailer {
    async fn deliver(&self, to: &str, report: &ReportPayload) -> anyhow::Result<Delivery> {
        let (Some(from), Some(transport)) = (&self.from, &self.transport) else {
            tracing::warn!(target: TARGET, "report for {} not sent: missing sender credentials", report.name);
            return Ok(Delivery::Skipped);
        };
        if to.trim().is_empty() {
            tracing::warn!(target: TARGET, "report for {} not sent: no recipient", report.name);
            return Ok(Delivery::Skipped);
        }

        let message = compose(from, to.trim(), report)?;
        transport.send(message).await?;
        tracing::info!(target: TARGET, "\x1b[36mreport sent to {to}\x1b[0m");
        Ok(Delivery::Sent)
    }
}
