use crate::post::Post;
use gtmpl::{Context, Template, Value};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Responsible for paginating, templating, and writing HTML pages to disk from
/// [`Post`]s.
pub struct Writer<'a> {
    /// The template for post pages.
    pub posts_template: &'a Template,

    /// The template for index pages.
    pub index_template: &'a Template,

    /// The base URL for index pages. The index pages will be located at
    /// `{index_base_url}/index.html`, `{index_base_url}/1.html`, etc. This
    /// should end in a trailing slash.
    pub index_base_url: &'a Url,

    /// The directory in which the index HTML files will be written, as
    /// `{index_output_directory}/index.html`,
    /// `{index_output_directory}/1.html`, etc.
    pub index_output_directory: &'a Path,

    /// The directory in which post HTML files will be written, as
    /// `{posts_output_directory}/{id}.html`.
    pub posts_output_directory: &'a Path,

    /// The number of posts per index page.
    pub index_page_size: usize,

    /// The URL for the site's home page. This is made available to both post
    /// and index templates, typically as the destination for the site-header
    /// link.
    pub home_page: &'a Url,

    /// The URL for the static assets. This is made available to both post and
    /// index templates, typically for the theme's stylesheet.
    pub static_url: &'a Url,
}

impl Writer<'_> {
    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let mut value = page.to_value();
        if let Value::Object(obj) = &mut value {
            obj.insert(
                "home_page".to_owned(),
                Value::String(self.home_page.to_string()),
            );
            obj.insert(
                "static_url".to_owned(),
                Value::String(self.static_url.to_string()),
            );
        }
        page.template.execute(
            &mut std::fs::File::create(&page.file_path)?,
            &Context::from(value)?,
        )?;
        Ok(())
    }

    /// Takes a slice of [`Post`] in display order and writes the post and
    /// index pages to disk.
    pub fn write_posts(&self, posts: &[Post]) -> Result<()> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        let pages = pages(
            posts,
            self.index_base_url,
            self.index_output_directory,
            self.index_page_size,
            self.index_template,
            self.posts_output_directory,
            self.posts_template,
        );
        for page in pages {
            if let Some(dir) = page.file_path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir)?;
                }
            }
            self.write_page(&page)?;
        }
        Ok(())
    }
}

/// Creates all of the index and post [`Page`]s for a set of [`Post`]s. See
/// [`Writer`] for a description of arguments. Calls [`index_pages`] and
/// [`post_pages`] and returns the union of their results as a single stream of
/// [`Page`]s.
fn pages<'a>(
    posts: &'a [Post],
    index_base_url: &'a Url,
    index_output_directory: &'a Path,
    index_page_size: usize,
    index_template: &'a Template,
    posts_output_directory: &'a Path,
    posts_template: &'a Template,
) -> impl Iterator<Item = Page<'a>> {
    index_pages(
        posts,
        index_base_url,
        index_output_directory,
        index_page_size,
        index_template,
    )
    .chain(post_pages(posts, posts_output_directory, posts_template))
}

/// Creates the post [`Page`]s; `prev` and `next` link neighbouring posts.
fn post_pages<'a>(
    posts: &'a [Post],
    output_directory: &'a Path,
    template: &'a Template,
) -> impl Iterator<Item = Page<'a>> {
    posts.iter().enumerate().map(move |(i, post)| Page {
        item: post.to_value(),
        file_path: output_directory.join(format!("{}.html", post.id)),
        prev: match i {
            0 => None,
            _ => Some(posts[i - 1].url.clone()),
        },
        next: posts.get(i + 1).map(|p| p.url.clone()),
        template,
    })
}

/// Chunks the posts into index [`Page`]s of `index_page_size` summaries. A
/// site without posts still gets an empty `index.html`.
fn index_pages<'a>(
    posts: &'a [Post],
    index_base_url: &'a Url,
    index_output_directory: &'a Path,
    index_page_size: usize,
    index_template: &'a Template,
) -> impl Iterator<Item = Page<'a>> {
    let page_size = index_page_size.max(1);
    let total_pages = ((posts.len() + page_size - 1) / page_size).max(1);

    (0..total_pages).map(move |i| {
        let chunk = posts.iter().skip(i * page_size).take(page_size);
        Page {
            item: Value::Array(chunk.map(Post::summarize).collect()),
            file_path: index_output_directory.join(index_file_name(i)),
            prev: match i {
                0 => None,
                _ => index_base_url.join(&index_file_name(i - 1)).ok(),
            },
            next: match i + 1 < total_pages {
                false => None,
                true => index_base_url.join(&index_file_name(i + 1)).ok(),
            },
            template: index_template,
        }
    })
}

fn index_file_name(i: usize) -> String {
    match i {
        0 => String::from("index.html"),
        _ => format!("{}.html", i),
    }
}

/// An object representing an output HTML file. A [`Page`] can be converted to
/// a [`Value`] and thus rendered in a template via [`Page::to_value`].
struct Page<'a> {
    /// The main item for the page.
    item: Value,

    /// The target location on disk for the output file.
    file_path: PathBuf,

    /// The URL for the previous page, if any.
    prev: Option<Url>,

    /// The URL for the next page, if any.
    next: Option<Url>,

    /// The template with which the page will be rendered.
    template: &'a Template,
}

impl Page<'_> {
    /// Converts a [`Page`] into a [`Value`]. The result is a [`Value::Object`]
    /// with fields `item`, `prev`, and `next` (see [`Page`] for descriptions).
    fn to_value(&self) -> Value {
        use std::collections::HashMap;

        let option_to_value = |opt: &Option<Url>| match opt {
            Some(url) => Value::String(url.to_string()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("item".to_owned(), self.item.clone());
        m.insert("prev".to_owned(), option_to_value(&self.prev));
        m.insert("next".to_owned(), option_to_value(&self.next));
        Value::Object(m)
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => write!(f, "rendering template: {}", err),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::id::ResourceId;
    use crate::post::PostMetadata;

    fn template(text: &str) -> Template {
        let mut template = Template::default();
        template.parse(text).unwrap();
        template
    }

    fn post(id: u32) -> Post {
        let metadata = PostMetadata {
            title: format!("Post {}", id),
            ..PostMetadata::default()
        };
        Post::render(
            ResourceId::new(id).unwrap(),
            metadata,
            "Body",
            &Url::parse("https://example.org/posts/").unwrap(),
            "%Y",
        )
        .unwrap()
    }

    #[test]
    fn test_write_posts() {
        let out = tempfile::tempdir().unwrap();
        let index_template = template(
            "{{range .item}}[{{.title}}]{{end}}|{{if .prev}}{{.prev}}{{end}}|{{if .next}}{{.next}}{{end}}",
        );
        let posts_template = template("{{.item.title}}|{{.prev}}|{{.next}}");
        let index_url = Url::parse("https://example.org/pages/").unwrap();
        let home_page = Url::parse("https://example.org/").unwrap();
        let static_url = Url::parse("https://example.org/static/").unwrap();
        let writer = Writer {
            posts_template: &posts_template,
            index_template: &index_template,
            index_base_url: &index_url,
            index_output_directory: &out.path().join("pages"),
            posts_output_directory: &out.path().join("posts"),
            index_page_size: 2,
            home_page: &home_page,
            static_url: &static_url,
        };

        let posts: Vec<Post> = (1..=3).map(post).collect();
        writer.write_posts(&posts).unwrap();

        let read = |p: &str| std::fs::read_to_string(out.path().join(p)).unwrap();
        assert_eq!(
            "[Post 1][Post 2]||https://example.org/pages/1.html",
            read("pages/index.html")
        );
        assert_eq!(
            "[Post 3]|https://example.org/pages/index.html|",
            read("pages/1.html")
        );
        assert_eq!(
            "Post 2|https://example.org/posts/1.html|https://example.org/posts/3.html",
            read("posts/2.html")
        );
    }

    #[test]
    fn test_empty_site_has_index() {
        let out = tempfile::tempdir().unwrap();
        let index_template = template("{{range .item}}x{{end}}empty");
        let posts_template = template("post");
        let url = Url::parse("https://example.org/").unwrap();
        let writer = Writer {
            posts_template: &posts_template,
            index_template: &index_template,
            index_base_url: &url,
            index_output_directory: out.path(),
            posts_output_directory: out.path(),
            index_page_size: 10,
            home_page: &url,
            static_url: &url,
        };
        writer.write_posts(&[]).unwrap();
        assert!(out.path().join("index.html").is_file());
    }
}
