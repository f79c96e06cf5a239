//! Server-rendered pages: provider selection and the code flow.

use axum::response::Html;

/// Visual theme for the hosted pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Page title.
    pub title: String,
    /// Corner radius preset: `none`, `sm`, `md`, `lg`, or `full`.
    pub radius: String,
    /// Page background color.
    pub background: String,
    /// Accent color for buttons and links.
    pub primary: String,
    /// Logo image URL.
    pub logo: Option<String>,
    /// Favicon URL.
    pub favicon: Option<String>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: "Sign in".to_string(),
            radius: "md".to_string(),
            background: "#FFFFFF".to_string(),
            primary: "#000000".to_string(),
            logo: None,
            favicon: None,
        }
    }
}

impl Theme {
    fn radius_css(&self) -> &'static str {
        match self.radius.as_str() {
            "none" => "0",
            "sm" => "4px",
            "lg" => "12px",
            "full" => "999px",
            _ => "8px",
        }
    }
}

/// Text shown by the code flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeCopy {
    /// Shown above the email form.
    pub code_info: String,
    /// Error for a wrong code.
    pub code_invalid: String,
    /// Error once a code expired or ran out of attempts.
    pub code_expired: String,
    /// Label of the resend button.
    pub code_resend: String,
    /// Prefix of the "code sent to" notice.
    pub code_sent: String,
    /// Prefix of the "code resent to" notice.
    pub code_resent: String,
    /// Error for a rejected email claim.
    pub email_invalid: String,
    /// Email field placeholder.
    pub email_placeholder: String,
    /// Code field placeholder.
    pub code_placeholder: String,
    /// Submit button label.
    pub button_continue: String,
}

impl Default for CodeCopy {
    fn default() -> Self {
        Self {
            code_info: "We'll send a pin code to your email.".to_string(),
            code_invalid: "Invalid code".to_string(),
            code_expired: "Code expired, request a new one".to_string(),
            code_resend: "Resend code".to_string(),
            code_sent: "Code sent to ".to_string(),
            code_resent: "Code resent to ".to_string(),
            email_invalid: "Email address is not valid".to_string(),
            email_placeholder: "Email".to_string(),
            code_placeholder: "Code".to_string(),
            button_continue: "Continue".to_string(),
        }
    }
}

/// Escape text for inclusion in HTML.
pub(crate) fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(theme: &Theme, body: &str) -> Html<String> {
    let favicon = theme
        .favicon
        .as_deref()
        .map(|href| format!(r#"<link rel="icon" href="{}">"#, escape(href)))
        .unwrap_or_default();
    let logo = theme
        .logo
        .as_deref()
        .map(|src| format!(r#"<img class="logo" src="{}" alt="">"#, escape(src)))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    {favicon}
    <style>
      body {{ background: {background}; font-family: system-ui, sans-serif; display: flex; justify-content: center; padding-top: 10vh; }}
      main {{ width: 320px; display: flex; flex-direction: column; gap: 12px; }}
      .logo {{ max-height: 48px; align-self: center; margin-bottom: 16px; }}
      a.button, button {{ display: block; text-align: center; text-decoration: none; padding: 10px; border: 0; border-radius: {radius}; background: {primary}; color: #FFFFFF; font-size: 1rem; cursor: pointer; width: 100%; }}
      button.link {{ background: none; color: {primary}; }}
      input {{ padding: 10px; border: 1px solid #CCCCCC; border-radius: {radius}; font-size: 1rem; width: 100%; box-sizing: border-box; }}
      form {{ display: flex; flex-direction: column; gap: 12px; }}
      .info {{ color: #555555; }}
      .error {{ color: #B00020; }}
    </style>
  </head>
  <body>
    <main>
      {logo}
      {body}
    </main>
  </body>
</html>"#,
        title = escape(&theme.title),
        background = escape(&theme.background),
        primary = escape(&theme.primary),
        radius = theme.radius_css(),
    ))
}

/// Provider selection page: one button per `(id, display)` entry.
pub(crate) fn select_page(theme: &Theme, providers: &[(String, String)]) -> Html<String> {
    let buttons: String = providers
        .iter()
        .map(|(id, display)| {
            format!(
                r#"<a class="button" href="/{}/authorize">{}</a>"#,
                escape(id),
                escape(display)
            )
        })
        .collect::<Vec<_>>()
        .join("\n      ");
    layout(theme, &buttons)
}

/// Email entry form of the code flow.
pub(crate) fn code_start_page(
    theme: &Theme,
    copy: &CodeCopy,
    provider: &str,
    error: Option<&str>,
) -> Html<String> {
    let notice = match error {
        Some(message) => format!(r#"<p class="error">{}</p>"#, escape(message)),
        None => format!(r#"<p class="info">{}</p>"#, escape(&copy.code_info)),
    };
    let body = format!(
        r#"{notice}
      <form method="post" action="/{provider}/authorize">
        <input type="hidden" name="action" value="request">
        <input type="email" name="email" placeholder="{placeholder}" autofocus required>
        <button type="submit">{button}</button>
      </form>"#,
        provider = escape(provider),
        placeholder = escape(&copy.email_placeholder),
        button = escape(&copy.button_continue),
    );
    layout(theme, &body)
}

/// Notice shown on the code entry form.
pub(crate) enum CodeNotice<'a> {
    Sent(&'a str),
    Resent(&'a str),
    Invalid,
}

/// Code entry form of the code flow.
pub(crate) fn code_verify_page(
    theme: &Theme,
    copy: &CodeCopy,
    provider: &str,
    notice: CodeNotice<'_>,
) -> Html<String> {
    let notice = match notice {
        CodeNotice::Sent(email) => format!(
            r#"<p class="info">{}{}</p>"#,
            escape(&copy.code_sent),
            escape(email)
        ),
        CodeNotice::Resent(email) => format!(
            r#"<p class="info">{}{}</p>"#,
            escape(&copy.code_resent),
            escape(email)
        ),
        CodeNotice::Invalid => format!(r#"<p class="error">{}</p>"#, escape(&copy.code_invalid)),
    };
    let body = format!(
        r#"{notice}
      <form method="post" action="/{provider}/authorize">
        <input type="hidden" name="action" value="verify">
        <input type="text" name="code" inputmode="numeric" autocomplete="one-time-code" placeholder="{placeholder}" autofocus required>
        <button type="submit">{button}</button>
      </form>
      <form method="post" action="/{provider}/authorize">
        <input type="hidden" name="action" value="resend">
        <button type="submit" class="link">{resend}</button>
      </form>"#,
        provider = escape(provider),
        placeholder = escape(&copy.code_placeholder),
        button = escape(&copy.button_continue),
        resend = escape(&copy.code_resend),
    );
    layout(theme, &body)
}
