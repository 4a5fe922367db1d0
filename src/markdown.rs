use pulldown_cmark::{html, Event, Options, Parser, Tag};

const FOLD_TAG: &str = "<!-- more -->";

/// Converts markdown to HTML, appending the result onto `out`.
pub fn to_html(out: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    html::push_html(out, Parser::new_ext(markdown, options).map(convert));
}

fn convert(ev: Event) -> Event {
    match ev {
        // The headings in the post itself need to be demoted twice to be
        // subordinate to both the site title (h1) and the post title (h2). So
        // `#` becomes h3 instead of h1. HTML stops at h6.
        Event::Start(Tag::Heading(s)) => Event::Start(Tag::Heading((s + 2).min(6))),
        Event::End(Tag::Heading(s)) => Event::End(Tag::Heading((s + 2).min(6))),
        _ => ev,
    }
}

/// Returns the HTML above the `<!-- more -->` fold and whether a fold was
/// found. Without a fold the whole body is the summary.
pub fn summary(html: &str) -> (&str, bool) {
    match html.find(FOLD_TAG) {
        Some(i) => (&html[..i], true),
        None => (html, false),
    }
}
