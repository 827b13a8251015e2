// web-server/src/static_files.rs
use actix_files::Files;
use actix_web::{web, HttpResponse};
use common::{escape_html, StaticFilesConfig};
use std::path::Path;

/// Placeholder in the page template replaced by the login widget bot name
pub const BOT_NAME_PLACEHOLDER: &str = "{{bot_name}}";

/// Chat page rendered once at startup
#[derive(Clone, Debug)]
pub struct IndexPage {
    html: String,
}

impl IndexPage {
    pub fn render(template: &str, bot_name: &str) -> Self {
        Self {
            html: template.replace(BOT_NAME_PLACEHOLDER, &escape_html(bot_name)),
        }
    }

    /// Read the page template from the static directory
    pub fn load(config: &StaticFilesConfig, bot_name: &str) -> std::io::Result<Self> {
        let index_path = Path::new(&config.path).join(&config.index);
        let template = std::fs::read_to_string(&index_path)?;
        tracing::info!("Loaded chat page template from {}", index_path.display());
        Ok(Self::render(&template, bot_name))
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

async fn index(page: web::Data<IndexPage>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page.html().to_string())
}

// Chat page at `/` plus its assets under `/static`
pub fn configure(cfg: &mut web::ServiceConfig, config: &StaticFilesConfig) {
    cfg.route("/", web::get().to(index)).service(
        Files::new("/static", &config.path)
            .prefer_utf8(true)
            .use_etag(true)
            .use_last_modified(true),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_bot_name() {
        let page = IndexPage::render(r#"<script data-telegram-login="{{bot_name}}"></script>"#, "my\"bot");
        assert_eq!(page.html(), r#"<script data-telegram-login="my&quot;bot"></script>"#);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>{{bot_name}}</h1>").unwrap();

        let config = StaticFilesConfig {
            path: dir.path().to_string_lossy().into_owned(),
            index: "index.html".to_string(),
        };
        let page = IndexPage::load(&config, "LiveChatBot").unwrap();
        assert_eq!(page.html(), "<h1>LiveChatBot</h1>");
    }

    #[test]
    fn test_missing_template_is_error() {
        let config = StaticFilesConfig {
            path: "/nonexistent/livechat".to_string(),
            index: "index.html".to_string(),
        };
        assert!(IndexPage::load(&config, "bot").is_err());
    }
}
