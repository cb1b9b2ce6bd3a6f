//! [`Generator`] runs one submission end to end: fetch, parse, render, and
//! the side effects of each [`Variant`].

use crate::{
    client::{self, Client},
    config, docx,
    html::Html,
    idea::{self, AppIdea, Object, Palette, ParseError},
    key::MissingKey,
    prompt::{PromptRequest, Variant},
    render, theme,
    theme::{Theme, ThemeFile},
    whois::{self, DomainStatus, Lookup, Whois},
    Model,
};

/// Everything that can go wrong during a submission.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No API token. Nothing else can run.
    #[error(transparent)]
    CredentialMissing(#[from] MissingKey),
    /// The prediction could not be created or its stream failed.
    #[error("An error occurred: {0}")]
    Stream(client::Error),
    /// The reply was not a JSON object.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A domain lookup failed. [`Generator`] folds these into
    /// [`DomainStatus::Unknown`], so only direct [`Lookup`] users see it.
    #[error("An error occurred: {0}")]
    Lookup(#[from] whois::Error),
    /// The theme file could not be read or written.
    #[error("An error occurred: {0}")]
    Theme(#[from] theme::Error),
    /// The document could not be packaged.
    #[error("An error occurred: {0}")]
    Export(#[from] docx::Error),
    /// Invalid settings.
    #[error("An error occurred: {0}")]
    Config(#[from] config::Error),
}

impl From<client::Error> for Error {
    fn from(error: client::Error) -> Self {
        match error {
            client::Error::Key(missing) => Self::CredentialMissing(missing),
            other => Self::Stream(other),
        }
    }
}

/// Result of a [`Variant::Palette`] submission.
#[derive(Debug, Clone)]
pub struct PaletteReport {
    /// Extracted fields.
    pub palette: Palette,
    /// The reply as parsed.
    pub raw: Object,
    /// Theme as written to the file.
    pub theme: Theme,
    /// Terminal output.
    pub summary: String,
    /// Styled page with the summary.
    pub page: Html,
}

/// Result of a [`Variant::Idea`] submission.
#[derive(Debug, Clone)]
pub struct IdeaReport {
    /// Extracted fields.
    pub idea: AppIdea,
    /// Availability of the `.com` domain for the name.
    pub status: DomainStatus,
    /// Terminal output.
    pub markdown: String,
    /// Download name of the document.
    pub filename: String,
    /// `<a>` element holding the document as a `data:` URI.
    pub link: String,
    /// Styled page with the markdown and the link.
    pub page: Html,
}

/// Result of any submission.
#[derive(Debug, Clone, derive_more::IsVariant)]
pub enum Report {
    /// From [`Variant::Palette`].
    Palette(PaletteReport),
    /// From [`Variant::Idea`].
    Idea(IdeaReport),
}

/// Runs submissions against one [`Client`].
pub struct Generator<L = Whois> {
    client: Client,
    model: Model,
    lookup: L,
    theme: ThemeFile,
    /// Theme as it was before any submission.
    current: Theme,
}

impl<L> Generator<L>
where
    L: Lookup,
{
    /// New generator writing to `theme`. Pages use default colors until
    /// [`with_theme`] is called.
    ///
    /// [`with_theme`]: Self::with_theme
    pub fn new(client: Client, model: Model, lookup: L, theme: ThemeFile) -> Self {
        Self {
            client,
            model,
            lookup,
            theme,
            current: Theme::default(),
        }
    }

    /// Style pages with `current`, usually the theme file as read at
    /// startup. Its background is used when an idea has none.
    pub fn with_theme(mut self, current: Theme) -> Self {
        self.current = current;
        self
    }

    /// Theme file this generator writes to.
    pub fn theme_file(&self) -> &ThemeFile {
        &self.theme
    }

    /// Stream a completion for `request` and finish it according to its
    /// variant.
    pub async fn generate(&self, request: &PromptRequest) -> Result<Report, Error> {
        #[cfg(feature = "log")]
        log::info!("Generating {:?} for {:?}", request.variant, request.text);

        let text = self.client.complete(&self.model, request).await?;

        match request.variant {
            Variant::Palette => self.finish_palette(&text).map(Report::Palette),
            Variant::Idea => self.finish_idea(&text).await.map(Report::Idea),
        }
    }

    /// Parse a palette reply and write its color to the theme file.
    pub fn finish_palette(&self, text: &str) -> Result<PaletteReport, Error> {
        let raw = idea::parse(text)?;
        let palette = Palette::from_object(&raw);

        let theme = self
            .theme
            .set_colors(&palette.primary_color, &palette.primary_color)?;

        Ok(PaletteReport {
            summary: render::palette_summary(&palette, &raw),
            page: render::palette_page(&palette, &raw, &theme),
            palette,
            raw,
            theme,
        })
    }

    /// Parse an idea reply, look up its domain and build its document.
    pub async fn finish_idea(&self, text: &str) -> Result<IdeaReport, Error> {
        let raw = idea::parse(text)?;
        let background = self
            .current
            .background_color
            .as_deref()
            .unwrap_or(AppIdea::DEFAULT_BACKGROUND);
        let idea = AppIdea::from_object_with(&raw, background);

        let status = whois::check(&self.lookup, &idea.name).await;
        let markdown = render::markdown(&idea, status);
        let filename = render::filename(&idea);
        let link = render::document(&idea, status).download_link(&filename)?;
        let page = render::idea_page(&idea, &markdown, Some(&link));

        Ok(IdeaReport {
            idea,
            status,
            markdown,
            filename,
            link,
            page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whois::tests::Fixed;

    // Not a real token.
    const FAKE_API_KEY: &str = "r8_0000000000000000000000000000000000000";

    fn generator(
        dir: &tempfile::TempDir,
        registered: Option<bool>,
    ) -> Generator<Fixed> {
        Generator::new(
            Client::new(FAKE_API_KEY.to_string()).unwrap(),
            Model::default(),
            Fixed(registered),
            ThemeFile::new(dir.path().join(".streamlit/config.toml")),
        )
    }

    #[test]
    fn test_finish_palette_writes_theme() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&dir, None);

        let report = generator
            .finish_palette(include_str!("../test/data/palette.json"))
            .unwrap();

        assert_eq!(report.palette.primary_color, "#4A90E2");
        let theme = generator.theme_file().read().unwrap();
        assert_eq!(theme, report.theme);
        assert_eq!(theme.primary_color.as_deref(), Some("#4A90E2"));
        assert_eq!(theme.background_color.as_deref(), Some("#4A90E2"));
        assert!(report.summary.starts_with("Primary color updated to: #4A90E2"));
    }

    #[test]
    fn test_finish_palette_default_color() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&dir, None);

        let report = generator.finish_palette("{\"Name\": \"Zap\"}").unwrap();
        assert_eq!(report.palette.primary_color, "#FFFFFF");
        assert_eq!(
            generator.theme_file().read().unwrap().primary_color.as_deref(),
            Some("#FFFFFF")
        );
    }

    #[test]
    fn test_finish_palette_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&dir, None);

        let err = generator
            .finish_palette("Here's your palette: blue")
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(
            err.to_string(),
            "Failed to parse the JSON response. Please try again."
        );
        // Nothing was written.
        assert!(!generator.theme_file().path().exists());
    }

    #[tokio::test]
    async fn test_finish_idea() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&dir, Some(false));

        let report = generator
            .finish_idea(include_str!("../test/data/idea.json"))
            .await
            .unwrap();

        assert_eq!(report.idea.name, "Plantastic.ai");
        assert_eq!(report.status, DomainStatus::Available);
        assert_eq!(report.filename, "Plantastic.ai.docx");
        assert!(report.markdown.contains(
            "Leaf scanner 🌟 Watering schedule 🌟 Pest alerts"
        ));
        assert!(report.link.contains("download=\"Plantastic.ai.docx\""));
        assert!(report.page.contains("background-color: #1B2B1F;"));
        assert!(report.page.contains(&report.link));
        // Idea flow leaves the theme alone.
        assert!(!generator.theme_file().path().exists());
    }

    #[tokio::test]
    async fn test_finish_idea_uses_startup_theme() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&dir, Some(false)).with_theme(Theme {
            primary_color: Some("#FF4B4B".into()),
            background_color: Some("#0E1117".into()),
        });

        // No `Background_Color` in the reply.
        let report = generator
            .finish_idea("{\"Name\": \"Zap.ai\"}")
            .await
            .unwrap();
        assert_eq!(report.idea.background_color, "#0E1117");
        assert!(report.page.contains("background-color: #0E1117;"));

        // The reply's own color wins.
        let report = generator
            .finish_idea(include_str!("../test/data/idea.json"))
            .await
            .unwrap();
        assert!(report.page.contains("background-color: #1B2B1F;"));
    }

    #[tokio::test]
    async fn test_finish_idea_lookup_error() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&dir, None);

        let report = generator.finish_idea("{}").await.unwrap();
        assert_eq!(report.idea.name, "App Name");
        assert_eq!(report.status, DomainStatus::Unknown);
        assert!(report.markdown.contains("Domain Availability Unknown ❔"));
    }

    #[tokio::test]
    async fn test_finish_idea_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&dir, Some(true));

        let err = generator.finish_idea("not json").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_collected_stream_feeds_idea() {
        use crate::stream::FilterExt;

        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&dir, Some(true));

        let text = crate::stream::tests::mock_stream(include_str!(
            "../test/data/idea.stream.txt"
        ))
        .collect_text()
        .await
        .unwrap();
        let report = generator.finish_idea(&text).await.unwrap();

        assert_eq!(report.status, DomainStatus::Taken);
        assert_eq!(report.idea.features.len(), 3);
        assert_eq!(report.idea.emoji, "🌱");
    }

    #[tokio::test]
    async fn test_generate_palette_local() {
        use crate::client::tests::{http_response, serve};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let prediction = format!(
            r#"{{"id":"p2","status":"starting","urls":{{"stream":"{base}/streams/p2"}}}}"#
        );
        let server = serve(
            listener,
            vec![
                http_response("201 Created", "application/json", &prediction),
                http_response(
                    "200 OK",
                    "text/event-stream",
                    include_str!("../test/data/palette.stream.txt"),
                ),
            ],
        );

        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(
            Client::new(FAKE_API_KEY.to_string())
                .unwrap()
                .with_base_url(base),
            Model::default(),
            Fixed(None),
            ThemeFile::new(dir.path().join("config.toml")),
        );
        let request =
            PromptRequest::resolve(Variant::Palette, None, true).unwrap();

        let report = generator.generate(&request).await.unwrap();
        let Report::Palette(report) = report else {
            panic!("Expected a palette report");
        };
        assert_eq!(
            generator.theme_file().read().unwrap().primary_color,
            Some(report.palette.primary_color.clone())
        );

        let requests = server.await.unwrap();
        assert!(requests[0].contains("random AI app idea"));
    }

    #[tokio::test]
    async fn test_generate_canceled_local() {
        use crate::client::tests::{http_response, serve};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let prediction = format!(
            r#"{{"id":"p3","status":"starting","urls":{{"stream":"{base}/streams/p3"}}}}"#
        );
        let events = "event: output\ndata: {\"Primary_Color\":\n\nevent: done\ndata: {\"reason\":\"canceled\"}\n\n";
        let server = serve(
            listener,
            vec![
                http_response("201 Created", "application/json", &prediction),
                http_response("200 OK", "text/event-stream", events),
            ],
        );

        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(
            Client::new(FAKE_API_KEY.to_string())
                .unwrap()
                .with_base_url(base),
            Model::default(),
            Fixed(None),
            ThemeFile::new(dir.path().join("config.toml")),
        );
        let request =
            PromptRequest::resolve(Variant::Palette, Some("cats"), false)
                .unwrap();

        let err = generator.generate(&request).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(client::Error::Stream(
                crate::stream::Error::Ended { .. }
            ))
        ));
        assert_eq!(
            err.to_string(),
            "An error occurred: Prediction ended early: canceled"
        );
        // A partial reply never reaches the theme.
        assert!(!generator.theme_file().path().exists());

        server.await.unwrap();
    }

    #[test]
    fn test_error_from_client() {
        let missing = MissingKey {
            var: "REPLICATE_API_TOKEN".into(),
        };
        let err: Error = client::Error::Key(missing).into();
        assert!(matches!(err, Error::CredentialMissing(_)));
        assert_eq!(
            err.to_string(),
            "REPLICATE_API_TOKEN is not set in the environment variables."
        );

        let err: Error = client::Error::UnexpectedResponse {
            message: "Prediction has no stream URL.",
        }
        .into();
        assert!(matches!(err, Error::Stream(_)));
        assert_eq!(
            err.to_string(),
            "An error occurred: Unexpected response: Prediction has no stream URL."
        );
    }
}
