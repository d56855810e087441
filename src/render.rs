//! HTML rendering of explorer state.
//!
//! Every function here is pure: state in, [`Markup`] out. A host re-renders
//! after each applied event, so partial documents must render without
//! complaint. Missing-but-required fields fall back to neutral labels, a
//! section whose kind is not known yet renders as an empty placeholder, and
//! sections of unknown kinds render nothing.
//!
//! ## Markdown
//!
//! Articles and text sections go through pulldown-cmark with three rewrites:
//!
//! - headings h1–h3 get `id` = [`slug_id`] of their text, matching the table
//!   of contents;
//! - links are classified with [`classify_link`]: internal links point at
//!   `<link_prefix><encoded topic>` and carry `data-topic`, external links
//!   open in a new tab with `rel="noopener"`, anchors stay as written;
//! - raw HTML in generated text is shown as text, never interpreted.
//!
//! The cover slot is injected once, right after the first level-1 heading
//! (or at the top of content that has none).
//!
//! Uses [maud](https://maud.lambda.xyz/) for templating; everything
//! interpolated through `html!` is escaped.

use crate::config::{NewtConfig, RenderConfig, generate_color_css};
use crate::cover::{CoverImageState, CoverStatus};
use crate::extract::{Heading, slug_id};
use crate::navigation::{LinkTarget, classify_link, form_target, suggest, topic_path};
use crate::schema::{
    PartialCard, PartialFeed, PartialForm, PartialHero, PartialLink, PartialSection,
    PartialSiteDocument, WIKI_SECTION_NAME,
};
use crate::session::{ExplorerView, GenerationMode, SessionContent, SessionStatus};
use crate::stream::MarkdownDocument;
use crate::types::Topic;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html as md_html};

const CSS_STATIC: &str = include_str!("../static/newt.css");

const LOADING_TITLE: &str = "Loading…";
const COVER_LOADING: &str = "Generating cover image…";
const NO_SECTIONS: &str = "No sections found.";

// ============================================================================
// Markdown
// ============================================================================

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

fn in_toc(level: HeadingLevel) -> bool {
    matches!(level, HeadingLevel::H1 | HeadingLevel::H2 | HeadingLevel::H3)
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Opening tag for a rewritten link, or `None` to keep the original.
fn link_open_tag(href: &str, config: &RenderConfig) -> Option<String> {
    match classify_link(href) {
        LinkTarget::Internal(topic) => Some(format!(
            r#"<a href="{}" data-topic="{}">"#,
            escape_attr(&topic_path(&config.link_prefix, &topic)),
            escape_attr(topic.as_str())
        )),
        LinkTarget::External(url) => Some(format!(
            r#"<a href="{}" rel="noopener" target="_blank">"#,
            escape_attr(&url)
        )),
        LinkTarget::Anchor(_) | LinkTarget::Ignored => None,
    }
}

/// Render markdown to HTML. `cover` is placed after the first level-1
/// heading when given, or at the top when there is none.
pub fn render_markdown(text: &str, config: &RenderConfig, cover: Option<Markup>) -> Markup {
    let events: Vec<Event<'_>> = Parser::new_ext(text, markdown_options())
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        })
        .collect();

    // Heading texts first, so ids are known when the opening tag is written.
    let mut slugs = Vec::new();
    let mut current: Option<String> = None;
    for event in &events {
        match event {
            Event::Start(Tag::Heading { level, .. }) if in_toc(*level) => {
                current = Some(String::new());
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(t);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(buf) = current.take() {
                    slugs.push(slug_id(&buf));
                }
            }
            _ => {}
        }
    }

    let mut slugs = slugs.into_iter();
    let mut cover = cover;
    let mut rewritten_links = Vec::new();
    let mut out = Vec::with_capacity(events.len() + 1);
    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                classes,
                attrs,
                ..
            }) if in_toc(level) => {
                let id = slugs.next().filter(|s| !s.is_empty()).map(CowStr::from);
                out.push(Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }));
            }
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                out.push(event);
                if let Some(slot) = cover.take() {
                    out.push(Event::Html(CowStr::from(slot.into_string())));
                }
            }
            Event::Start(Tag::Link { ref dest_url, .. }) => {
                match link_open_tag(dest_url, config) {
                    Some(tag) => {
                        rewritten_links.push(true);
                        out.push(Event::InlineHtml(CowStr::from(tag)));
                    }
                    None => {
                        rewritten_links.push(false);
                        out.push(event);
                    }
                }
            }
            Event::End(TagEnd::Link) => {
                if rewritten_links.pop().unwrap_or(false) {
                    out.push(Event::InlineHtml(CowStr::Borrowed("</a>")));
                } else {
                    out.push(event);
                }
            }
            other => out.push(other),
        }
    }

    // No level-1 heading: the cover leads the article.
    if let Some(slot) = cover {
        out.insert(0, Event::Html(CowStr::from(slot.into_string())));
    }

    let mut body = String::new();
    md_html::push_html(&mut body, out.into_iter());
    PreEscaped(body)
}

// ============================================================================
// Article view
// ============================================================================

pub fn render_cover_slot(cover: &CoverImageState) -> Markup {
    let title = cover
        .requested_for_title
        .as_ref()
        .map(Topic::as_str)
        .unwrap_or_default();
    html! {
        @match cover.status {
            CoverStatus::Idle => {}
            CoverStatus::Loading => {
                figure.cover.loading { span { (COVER_LOADING) } }
            }
            CoverStatus::Ready => {
                figure.cover.ready {
                    @if let Some(url) = &cover.url {
                        img src=(url) alt={ "Illustration: " (title) };
                    }
                }
            }
            CoverStatus::Error => {
                figure.cover.error {
                    span { (cover.error.as_deref().unwrap_or("Cover image unavailable")) }
                }
            }
        }
    }
}

pub fn render_article(
    doc: &MarkdownDocument,
    cover: Option<&CoverImageState>,
    config: &RenderConfig,
) -> Markup {
    html! {
        article.wiki-article {
            (render_markdown(doc.text(), config, cover.map(render_cover_slot)))
        }
    }
}

/// Table of contents for h1–h3 headings.
pub fn render_toc(headings: &[Heading]) -> Markup {
    html! {
        nav.toc {
            h2 { "Contents" }
            @if headings.is_empty() {
                p.toc-empty { (NO_SECTIONS) }
            } @else {
                ul {
                    @for heading in headings {
                        li class={ "level-" (heading.level) } {
                            a href={ "#" (heading.slug_id) } { (heading.text) }
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Site view
// ============================================================================

/// A link to a navigation target (topic, URL, or anchor).
fn target_link(target: Option<&str>, label: &str, config: &RenderConfig) -> Markup {
    match target.map(classify_link) {
        Some(LinkTarget::Internal(topic)) => html! {
            a href=(topic_path(&config.link_prefix, &topic)) data-topic=(topic.as_str()) { (label) }
        },
        Some(LinkTarget::External(url)) => html! {
            a href=(url) rel="noopener" target="_blank" { (label) }
        },
        Some(LinkTarget::Anchor(id)) => html! {
            a href={ "#" (id) } { (label) }
        },
        Some(LinkTarget::Ignored) | None => html! { span { (label) } },
    }
}

fn render_links(links: &[Option<PartialLink>], config: &RenderConfig) -> Markup {
    html! {
        ul {
            @for link in links.iter().flatten() {
                li { (target_link(link.href.as_deref(), link.label.as_deref().unwrap_or("Link"), config)) }
            }
        }
    }
}

fn render_hero(hero: &PartialHero, config: &RenderConfig) -> Markup {
    html! {
        @if let Some(headline) = &hero.headline {
            h1 { (headline) }
        }
        @if let Some(sub) = &hero.subheadline {
            p.subheadline { (sub) }
        }
        @if let Some(cta) = &hero.cta {
            p.cta { (target_link(cta.target.as_deref(), cta.label.as_deref().unwrap_or("Open"), config)) }
        }
    }
}

fn render_card(card: &PartialCard, config: &RenderConfig) -> Markup {
    let title = card.title.as_deref().unwrap_or("Item");
    html! {
        li.card {
            h3 {
                @if card.target.is_some() {
                    (target_link(card.target.as_deref(), title, config))
                } @else {
                    (title)
                }
            }
            @if let Some(body) = &card.body {
                p { (body) }
            }
        }
    }
}

fn render_form(form: &PartialForm, current_topic: Option<&Topic>, config: &RenderConfig) -> Markup {
    let action = form_target(form.action_target.as_deref(), current_topic)
        .map(|topic| topic_path(&config.link_prefix, &topic));
    html! {
        @if let Some(title) = &form.title {
            h2 { (title) }
        }
        form method="get" action=[action] {
            @for field in form.fields.iter().flatten().flatten() {
                label {
                    span { (field.label.as_deref().unwrap_or("Field")) }
                    @if field.kind.unwrap_or_default().as_str() == "textarea" {
                        textarea name=[field.name.as_deref()] placeholder=[field.placeholder.as_deref()] {}
                    } @else {
                        input type=(field.kind.unwrap_or_default().as_str()) name=[field.name.as_deref()] placeholder=[field.placeholder.as_deref()];
                    }
                }
            }
            button type="submit" { (form.submit_label.as_deref().unwrap_or("Submit")) }
        }
    }
}

fn render_feed(feed: &PartialFeed, config: &RenderConfig) -> Markup {
    html! {
        @if let Some(title) = &feed.title {
            h2 { (title) }
        }
        @for post in feed.posts.iter().flatten().flatten() {
            article.post {
                header {
                    strong { (post.author.as_deref().unwrap_or("User")) }
                    @if let Some(handle) = &post.handle {
                        " " span.handle { (handle) }
                    }
                    @if let Some(ts) = &post.timestamp {
                        " " time { (ts) }
                    }
                }
                @if let Some(content) = &post.content {
                    p {
                        @if post.target.is_some() {
                            (target_link(post.target.as_deref(), content, config))
                        } @else {
                            (content)
                        }
                    }
                }
                @if let Some(likes) = post.likes {
                    p.likes { (format!("{likes} likes")) }
                }
            }
        }
    }
}

pub fn render_wiki(
    name: Option<&str>,
    subject: Option<&str>,
    article: Option<&str>,
    cover: Option<&CoverImageState>,
    config: &RenderConfig,
) -> Markup {
    html! {
        section.wiki {
            header.wiki-header {
                span.wiki-name { (name.unwrap_or(WIKI_SECTION_NAME)) }
                @if let Some(subject) = subject {
                    h2 { (subject) }
                }
            }
            article.wiki-article {
                (render_markdown(article.unwrap_or_default(), config, cover.map(render_cover_slot)))
            }
        }
    }
}

/// Render one section. `cover` is only used by wiki sections.
pub fn render_section(
    section: Option<&PartialSection>,
    cover: Option<&CoverImageState>,
    current_topic: Option<&Topic>,
    config: &RenderConfig,
) -> Markup {
    let Some(section) = section else {
        return html! { section.pending {} };
    };
    match section {
        PartialSection::Pending => html! { section.pending {} },
        PartialSection::Unknown(_) => html! {},
        PartialSection::Hero { hero } => html! {
            section.hero {
                @if let Some(hero) = hero { (render_hero(hero, config)) }
            }
        },
        PartialSection::Text { markdown } => html! {
            section.text {
                (render_markdown(markdown.as_deref().unwrap_or_default(), config, None))
            }
        },
        PartialSection::Grid { items } => html! {
            section.grid {
                ul {
                    @for card in items.iter().flatten().flatten() {
                        (render_card(card, config))
                    }
                }
            }
        },
        PartialSection::Feature { title, body } => html! {
            section.feature {
                h2 { (title.as_deref().unwrap_or("Feature")) }
                @if let Some(body) = body {
                    p { (body) }
                }
            }
        },
        PartialSection::Form { form } => html! {
            section.form {
                @if let Some(form) = form { (render_form(form, current_topic, config)) }
            }
        },
        PartialSection::Feed { feed } => html! {
            section.feed {
                @if let Some(feed) = feed { (render_feed(feed, config)) }
            }
        },
        PartialSection::Wiki {
            name,
            subject,
            article,
        } => render_wiki(
            name.as_deref(),
            subject.as_deref(),
            article.as_deref(),
            cover,
            config,
        ),
        PartialSection::Footer { links } => html! {
            footer.site-footer {
                @if let Some(links) = links { (render_links(links, config)) }
            }
        },
    }
}

/// Render a (possibly partial) site document. The cover goes into the first
/// wiki section only.
pub fn render_site(
    doc: &PartialSiteDocument,
    cover: Option<&CoverImageState>,
    current_topic: Option<&Topic>,
    config: &RenderConfig,
) -> Markup {
    let sections = doc.sections.as_deref().unwrap_or_default();
    let first_wiki = sections
        .iter()
        .position(|s| matches!(s, Some(PartialSection::Wiki { .. })));
    html! {
        div.site {
            header.site-header {
                @if let Some(title) = &doc.title {
                    h1 { (title) }
                }
                @if let Some(nav) = &doc.nav {
                    nav.site-nav { (render_links(nav, config)) }
                }
            }
            @for (idx, section) in sections.iter().enumerate() {
                (render_section(
                    section.as_ref(),
                    cover.filter(|_| Some(idx) == first_wiki),
                    current_topic,
                    config,
                ))
            }
        }
    }
}

// ============================================================================
// Page shell
// ============================================================================

fn base_document(
    title: &str,
    description: Option<&str>,
    css: &str,
    body_class: Option<&str>,
    content: Markup,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                @if let Some(description) = description {
                    meta name="description" content=(description);
                }
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// The document title, else the topic, else a loading label.
pub fn page_title(view: &ExplorerView<'_>) -> String {
    let from_content = match view.content {
        Some(SessionContent::Article(doc)) => doc.title(),
        Some(SessionContent::Site { stream, .. }) => stream.snapshot().title.clone(),
        None => None,
    };
    from_content
        .or_else(|| view.topic.map(|t| t.as_str().to_string()))
        .unwrap_or_else(|| LOADING_TITLE.to_string())
}

/// An article's lead paragraph, used as the page description.
fn page_description(view: &ExplorerView<'_>) -> Option<String> {
    match view.content {
        Some(SessionContent::Article(doc)) => doc.lead(),
        _ => None,
    }
}

fn status_line(view: &ExplorerView<'_>, config: &RenderConfig) -> Markup {
    html! {
        @match view.status {
            Some(SessionStatus::Streaming) => { p.status { "Generating…" } }
            Some(SessionStatus::Failed(message)) => {
                p.status.error {
                    "Generation failed: " (message) " "
                    @if let Some(topic) = view.topic {
                        a href=(topic_path(&config.link_prefix, topic)) data-topic=(topic.as_str()) { "Try again" }
                    }
                }
            }
            Some(SessionStatus::Cancelled) => { p.status { "Generation stopped." } }
            Some(SessionStatus::Complete) | None => {}
        }
    }
}

fn topic_chips(label: &str, topics: &[&str], config: &RenderConfig) -> Markup {
    html! {
        @if !topics.is_empty() {
            ul.chips aria-label=(label) {
                @for topic in topics.iter().filter_map(|t| Topic::parse(t)) {
                    li {
                        a href=(topic_path(&config.link_prefix, &topic)) data-topic=(topic.as_str()) { (topic.as_str()) }
                    }
                }
            }
        }
    }
}

/// The full page for the current explorer state.
pub fn render_page(view: &ExplorerView<'_>, config: &NewtConfig) -> Markup {
    let render = &config.render;
    let title = page_title(view);
    let css = format!("{}\n\n{}", generate_color_css(&config.colors), CSS_STATIC);
    let recent: Vec<&str> = view.history.entries().iter().map(Topic::as_str).collect();
    let body_class = match view.mode {
        GenerationMode::Article => "mode-article",
        GenerationMode::Site => "mode-site",
    };

    let content = html! {
        header.newt-header {
            a.brand href="/" { "Newt" }
            p.page-title { (title) }
        }
        (status_line(view, render))
        (topic_chips("Recent", &recent, render))
        @match view.content {
            Some(SessionContent::Article(doc)) => {
                div.layout {
                    (render_article(doc, view.cover, render))
                    (render_toc(&doc.headings()))
                }
            }
            Some(SessionContent::Site { stream, .. }) => {
                (render_site(stream.snapshot(), view.cover, view.topic, render))
            }
            None => {
                main.empty {
                    p { "Pick a topic to explore." }
                    (topic_chips("Suggestions", &suggest("", 6), render))
                }
            }
        }
    };

    base_document(&title, page_description(view).as_deref(), &css, Some(body_class), content)
}

// ============================================================================
// Tests
// ============================================================================
