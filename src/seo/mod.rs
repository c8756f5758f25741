//! SEO tooling: metadata audits plus sitemap and robots.txt generation.

pub mod audit;
pub mod sitemap;

pub use audit::{AuditKind, AuditSubject, KeywordDensity, SeoAudit, audit, keyword_density};
pub use sitemap::SitemapWriter;
