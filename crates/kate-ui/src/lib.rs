//! Server-rendered pages. The form itself is filled in by `script.js`
//! from `/get-categories`.

use askama::Template;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub title: &'a str,
    /// Prefix under which `script.js` and `style.css` are served.
    pub assets: &'a str,
}
