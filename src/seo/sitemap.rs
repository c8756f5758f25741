//! # Sitemap and robots.txt Generation
//!
//! Renders `sitemap.xml` and `robots.txt` from the current catalog state and
//! writes them to disk with a tmp-file rename, so a crash mid-write never
//! leaves a half-written file being served. Regeneration happens at startup,
//! on SEO settings updates and through the admin regenerate endpoint; the
//! public handlers only read the files back from disk.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{blog_post, category, perk};
use crate::repositories::{
    BlogPostRepository, CategoryRepository, PerkRepository, SeoSettingRepository,
};

/// Writes the generated SEO files for one public base URL.
#[derive(Debug, Clone)]
pub struct SitemapWriter {
    base_url: String,
    output_dir: PathBuf,
}

impl SitemapWriter {
    /// Creates a writer; trailing slashes on the base URL are dropped so
    /// joined paths never double up.
    pub fn new(base_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            output_dir: output_dir.into(),
        }
    }

    /// Path the sitemap is written to and served from.
    pub fn sitemap_path(&self) -> PathBuf {
        self.output_dir.join("sitemap.xml")
    }

    /// Path the robots file is written to and served from.
    pub fn robots_path(&self) -> PathBuf {
        self.output_dir.join("robots.txt")
    }

    /// Regenerates both files from the catalog.
    ///
    /// Includes the currently available perks, active categories and
    /// published posts; robots directives append the active SEO setting's
    /// `robots_extra` block verbatim.
    pub async fn write_all(&self, db: &Arc<DatabaseConnection>) -> Result<()> {
        let now = Utc::now();
        let perks = PerkRepository::new(db.clone()).find_for_sitemap().await?;
        let categories = CategoryRepository::new(db.clone()).find_all(false).await?;
        let posts = BlogPostRepository::new(db.clone()).find_for_sitemap().await?;
        let seo = SeoSettingRepository::new(db.clone()).active().await?;

        let sitemap = self.render_sitemap(now, &perks, &categories, &posts);
        let robots = self.render_robots(seo.as_ref().and_then(|s| s.robots_extra.as_deref()));

        self.write_atomic(&self.sitemap_path(), &sitemap)?;
        self.write_atomic(&self.robots_path(), &robots)?;

        tracing::info!(
            perks = perks.iter().filter(|p| p.is_available(now)).count(),
            categories = categories.len(),
            posts = posts.len(),
            output_dir = %self.output_dir.display(),
            "regenerated sitemap.xml and robots.txt"
        );
        Ok(())
    }

    fn render_sitemap(
        &self,
        now: DateTime<Utc>,
        perks: &[perk::Model],
        categories: &[category::Model],
        posts: &[blog_post::Model],
    ) -> String {
        let mut xml = String::with_capacity(4096);
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

        self.push_url(&mut xml, "/", Some(now.date_naive()), "daily", "1.0");
        for category in categories {
            self.push_url(
                &mut xml,
                &format!("/categories/{}", category.slug),
                Some(category.updated_at.date_naive()),
                "weekly",
                "0.6",
            );
        }
        for perk in perks.iter().filter(|p| p.is_available(now)) {
            self.push_url(
                &mut xml,
                &format!("/perks/{}", perk.slug),
                Some(perk.updated_at.date_naive()),
                "weekly",
                "0.8",
            );
        }
        self.push_url(&mut xml, "/blog", Some(now.date_naive()), "daily", "0.7");
        for post in posts {
            // Published rows always carry published_at; updated_at covers
            // imported data that predates the latch
            let lastmod = post.published_at.unwrap_or(post.updated_at);
            self.push_url(
                &mut xml,
                &format!("/blog/{}", post.slug),
                Some(lastmod.date_naive()),
                "monthly",
                "0.7",
            );
        }

        xml.push_str("</urlset>\n");
        xml
    }

    fn push_url(
        &self,
        xml: &mut String,
        path: &str,
        lastmod: Option<NaiveDate>,
        changefreq: &str,
        priority: &str,
    ) {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}{}</loc>\n",
            xml_escape(&self.base_url),
            xml_escape(path)
        ));
        if let Some(date) = lastmod {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", date.format("%Y-%m-%d")));
        }
        xml.push_str(&format!("    <changefreq>{}</changefreq>\n", changefreq));
        xml.push_str(&format!("    <priority>{}</priority>\n", priority));
        xml.push_str("  </url>\n");
    }

    fn render_robots(&self, extra: Option<&str>) -> String {
        let mut robots = String::new();
        robots.push_str("User-agent: *\n");
        robots.push_str("Allow: /\n");
        robots.push_str("Disallow: /api/admin/\n");
        if let Some(extra) = extra {
            let trimmed = extra.trim();
            if !trimmed.is_empty() {
                robots.push('\n');
                robots.push_str(trimmed);
                robots.push('\n');
            }
        }
        robots.push('\n');
        robots.push_str(&format!("Sitemap: {}/api/seo/sitemap.xml\n", self.base_url));
        robots
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating output directory {}", self.output_dir.display()))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents)
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("renaming {} into place", tmp.display()))?;
        Ok(())
    }
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
