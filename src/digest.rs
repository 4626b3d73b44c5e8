//! Notification digest for articles not yet mailed.
//!
//! Runs separately from scraping. It reads every unsent article from the
//! store, renders them into one HTML table, delivers it, and only after a
//! successful delivery flags exactly the delivered ids as sent.

use crate::cli::DigestArgs;
use crate::models::StoredArticle;
use crate::store::{ArticleStore, StoreError};
use lettre::message::{Mailbox, Message, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::fmt::Write;
use thiserror::Error;
use tracing::{error, info, instrument};

#[derive(Debug, Error)]
pub enum DigestError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid mail configuration: {0}")]
    Config(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers a rendered digest.
pub trait Deliver {
    async fn deliver(&self, subject: &str, html: &str) -> Result<(), DigestError>;
}

/// SMTP delivery with STARTTLS and login credentials.
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
}

fn parse_mailboxes(addresses: &[String]) -> Result<Vec<Mailbox>, DigestError> {
    addresses
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(|a| {
            a.parse::<Mailbox>()
                .map_err(|e| DigestError::Config(format!("{a}: {e}")))
        })
        .collect()
}

impl SmtpMailer {
    /// Build a STARTTLS mailer from the digest command's SMTP options.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Config`] for an unparsable sender or recipient
    /// address, an empty recipient list, or an unusable relay host.
    pub fn from_args(args: &DigestArgs) -> Result<Self, DigestError> {
        let from = args
            .sender_email
            .parse::<Mailbox>()
            .map_err(|e| DigestError::Config(format!("{}: {e}", args.sender_email)))?;
        let to = parse_mailboxes(&args.recipients)?;
        if to.is_empty() {
            return Err(DigestError::Config("no recipients".to_string()));
        }
        let cc = parse_mailboxes(&args.cc)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&args.smtp_server)
            .map_err(|e| DigestError::Config(e.to_string()))?
            .port(args.smtp_port)
            .credentials(Credentials::new(
                args.sender_email.clone(),
                args.sender_password.clone(),
            ))
            .build();

        Ok(Self { mailer, from, to, cc })
    }
}

impl Deliver for SmtpMailer {
    #[instrument(level = "info", skip_all, fields(to = self.to.len(), cc = self.cc.len()))]
    async fn deliver(&self, subject: &str, html: &str) -> Result<(), DigestError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        for cc in &self.cc {
            builder = builder.cc(cc.clone());
        }
        let message = builder
            .header(header::ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| DigestError::Config(e.to_string()))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| DigestError::Delivery(e.to_string()))?;
        Ok(())
    }
}

/// Render the digest body as an HTML table. All values are escaped.
pub fn render_digest_html(articles: &[StoredArticle]) -> String {
    use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

    let mut html = String::from(
        "<html>\n<body>\n<p>New Articles found:</p>\n\
         <table border='1' cellspacing='0' cellpadding='5'>\n\
         <tr><th>ID</th><th>Scraped Date</th><th>Website</th><th>Keyword</th><th>Article Heading</th><th>Link</th></tr>\n",
    );
    for a in articles {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><a href=\"{}\">{}</a></td></tr>",
            a.id,
            a.scraped_date,
            text(&a.website),
            text(a.keyword.label()),
            text(&a.title),
            attr(&a.link),
            text(&a.link),
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    NothingToSend,
    Sent { delivered: usize, marked: usize },
}

/// Deliver every unsent article and flag the delivered set as sent.
///
/// # Arguments
///
/// * `store` - Source of unsent articles; receives the `sent` flags
/// * `deliver` - Transport for the rendered HTML digest
/// * `subject` - Message subject
///
/// # Returns
///
/// [`DigestOutcome::NothingToSend`] when the store has no unsent articles,
/// otherwise how many were delivered and how many rows were flagged.
///
/// # Errors
///
/// A delivery failure is returned before anything is flagged, so the same
/// articles are retried on the next run.
#[instrument(level = "info", skip_all, fields(%subject))]
pub async fn send_digest<S, D>(store: &S, deliver: &D, subject: &str) -> Result<DigestOutcome, DigestError>
where
    S: ArticleStore,
    D: Deliver,
{
    let articles = store.unsent().await?;
    if articles.is_empty() {
        info!("No new articles to send");
        return Ok(DigestOutcome::NothingToSend);
    }
    info!(count = articles.len(), "Found unsent articles");

    let html = render_digest_html(&articles);
    if let Err(e) = deliver.deliver(subject, &html).await {
        error!(error = %e, "Digest delivery failed; articles stay unsent");
        return Err(e);
    }

    let ids: Vec<u64> = articles.iter().map(|a| a.id).collect();
    let marked = store.mark_sent(&ids).await?;
    info!(delivered = ids.len(), marked, "Digest sent");
    Ok(DigestOutcome::Sent {
        delivered: ids.len(),
        marked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcceptedArticle, Category};
    use crate::store::json::JsonFileStore;
    use chrono::{NaiveDate, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl Deliver for Outbox {
        async fn deliver(&self, subject: &str, html: &str) -> Result<(), DigestError> {
            if self.fail {
                return Err(DigestError::Delivery("connection refused".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), html.to_string()));
            Ok(())
        }
    }

    fn accepted(heading: &str, link: &str) -> AcceptedArticle {
        AcceptedArticle {
            scraped_date: NaiveDate::from_ymd_opt(2025, 5, 6).unwrap(),
            website: "Entrackr".to_string(),
            keyword: Category::MergersAcquisitions,
            heading: heading.to_string(),
            link: link.to_string(),
        }
    }

    #[test]
    fn test_render_escapes_values() {
        let html = render_digest_html(&[StoredArticle {
            id: 3,
            scraped_date: NaiveDate::from_ymd_opt(2025, 5, 6).unwrap(),
            website: "Entrackr".to_string(),
            keyword: Category::MergersAcquisitions,
            title: "FirmA <Acquires> FirmB".to_string(),
            link: "https://entrackr.com/a?x=1&y=\"2\"".to_string(),
            sent: false,
            inserted_at: Utc::now(),
        }]);
        assert!(html.contains("<td>3</td><td>2025-05-06</td>"));
        assert!(html.contains("M&amp;A"));
        assert!(html.contains("FirmA &lt;Acquires&gt; FirmB"));
        assert!(html.contains("href=\"https://entrackr.com/a?x=1&amp;y=&quot;2&quot;\""));
    }

    #[tokio::test]
    async fn test_nothing_to_send() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("articles.json"));
        let outbox = Outbox::default();
        let outcome = send_digest(&store, &outbox, "News").await.unwrap();
        assert_eq!(outcome, DigestOutcome::NothingToSend);
        assert!(outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_delivery_marks_sent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("articles.json"));
        store
            .insert_unsent(&[
                accepted("FirmA Acquires FirmB in cash deal", "https://e.com/1"),
                accepted("FirmC and FirmD Merge operations", "https://e.com/2"),
            ])
            .await
            .unwrap();
        let outbox = Outbox::default();

        let outcome = send_digest(&store, &outbox, "IPO & M&A News").await.unwrap();
        assert_eq!(outcome, DigestOutcome::Sent { delivered: 2, marked: 2 });
        assert!(store.unsent().await.unwrap().is_empty());

        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "IPO & M&A News");
        assert!(sent[0].1.contains("FirmC and FirmD Merge operations"));
    }

    #[tokio::test]
    async fn test_articles_added_after_render_stay_unsent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("articles.json"));
        store
            .insert_unsent(&[accepted("FirmA Acquires FirmB in cash deal", "https://e.com/1")])
            .await
            .unwrap();
        send_digest(&store, &Outbox::default(), "News").await.unwrap();

        store
            .insert_unsent(&[accepted("FirmE Demerger approved by board", "https://e.com/3")])
            .await
            .unwrap();
        let unsent = store.unsent().await.unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].id, 2);
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_unsent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("articles.json"));
        store
            .insert_unsent(&[accepted("FirmA Acquires FirmB in cash deal", "https://e.com/1")])
            .await
            .unwrap();
        let outbox = Outbox {
            fail: true,
            ..Outbox::default()
        };

        assert!(matches!(
            send_digest(&store, &outbox, "News").await,
            Err(DigestError::Delivery(_))
        ));
        assert_eq!(store.unsent().await.unwrap().len(), 1);
    }

    #[test]
    fn test_mailer_rejects_bad_addresses() {
        let args = DigestArgs {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            sender_email: "not an address".to_string(),
            sender_password: "x".to_string(),
            recipients: vec!["a@example.com".to_string()],
            cc: vec![],
            subject: "News".to_string(),
        };
        assert!(matches!(
            SmtpMailer::from_args(&args),
            Err(DigestError::Config(_))
        ));
    }
}
