use crate::message::Message;
use crate::user::CurrentUser;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn error_html(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<div class="error">{}</div>"#, escape(e)))
        .unwrap_or_default()
}

fn page(title: &str, nav: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/public/style.css">
</head><body>
<nav>{nav}</nav>
<h1>{title}</h1>
{body}
</body></html>"#
    )
}

pub fn home(messages: &[Message], user: Option<&CurrentUser>, error: Option<&str>) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"Logged in as <b>{}</b> <a href="/logout">Log out</a>"#,
            escape(&user.username)
        ),
        None => r#"<a href="/login">Log in</a> <a href="/register">Register</a>"#.into(),
    };

    let list: String = messages
        .iter()
        .map(|m| {
            format!(
                "  <li id=\"m{}\"><span class=\"author\">{}</span>{}</li>\n",
                m.id,
                m.author.as_deref().map_or_else(|| "anonymous".into(), escape),
                escape(&m.message),
            )
        })
        .collect();

    let body = format!(
        r#"{error}
<form method="POST" action="/message">
  <input type="text" name="message" required autocomplete="off" placeholder="Say something">
  <button type="submit">Post</button>
</form>
<ul class="messages">
{list}</ul>"#,
        error = error_html(error),
    );

    page("Message Board", &nav, &body)
}

fn credentials_form(action: &str, submit: &str, error: Option<&str>) -> String {
    format!(
        r#"{error}
<form method="POST" action="{action}">
  <label>Username <input type="text" name="username" required autocomplete="username"></label>
  <label>Password <input type="password" name="password" required></label>
  <button type="submit">{submit}</button>
</form>"#,
        error = error_html(error),
    )
}

pub fn register(error: Option<&str>) -> String {
    page(
        "Register",
        r#"<a href="/">Home</a> <a href="/login">Log in</a>"#,
        &credentials_form("/register", "Register", error),
    )
}

pub fn login(error: Option<&str>) -> String {
    page(
        "Log in",
        r#"<a href="/">Home</a> <a href="/register">Register</a>"#,
        &credentials_form("/login", "Log in", error),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
    }

    #[test]
    fn home_lists_messages() {
        let messages = [
            Message {
                id: 1,
                message: "<b>hi</b>".into(),
                author: Some("alice".into()),
            },
            Message {
                id: 2,
                message: "psst".into(),
                author: None,
            },
        ];

        let html = home(&messages, None, None);

        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(!html.contains("<b>hi</b>"));
        assert!(html.contains(r#"<span class="author">anonymous</span>psst"#));
        assert!(html.contains(r#"href="/login""#));
        assert!(!html.contains(r#"class="error""#));
    }

    #[test]
    fn home_shows_user_and_error() {
        let alice = CurrentUser {
            id: 1,
            username: "alice".into(),
        };

        let html = home(&[], Some(&alice), Some("Something went wrong"));

        assert!(html.contains("Logged in as <b>alice</b>"));
        assert!(html.contains(r#"<div class="error">Something went wrong</div>"#));
    }

    #[test]
    fn forms_post_to_themselves() {
        assert!(register(None).contains(r#"action="/register""#));
        assert!(login(Some("Username taken")).contains("Username taken"));
    }
}
