//! Named email templates rendered with a `{name, link}` context.

/// Context every template is rendered with.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub name: String,
    pub link: String,
}

/// A rendered template: HTML body plus a plain-text alternative.
#[derive(Debug)]
pub struct Rendered {
    pub html: String,
    pub text: String,
}

/// Render a template by name. Returns None for unknown template names.
pub fn render(template: &str, ctx: &TemplateContext) -> Option<Rendered> {
    match template {
        "verifyEmail" => Some(render_verify_email(ctx)),
        "notification" => Some(render_notification(ctx)),
        _ => None,
    }
}

fn render_verify_email(ctx: &TemplateContext) -> Rendered {
    let html = wrap_html(
        "Verify your account",
        &format!(
            r#"<p>Hi {name},</p>
<p>Thanks for signing up. Please confirm your email address to activate your account.</p>
<div class="button-container">
    <a href="{link}" class="button">Verify my account</a>
</div>
<p class="note">This link expires in 1 hour. If you didn't create an account, you can safely ignore this email.</p>"#,
            name = html_escape(&ctx.name),
            link = ctx.link,
        ),
    );

    let text = format!(
        "Verify your account\n\n\
Hi {name},\n\n\
Thanks for signing up. Please confirm your email address to activate your account:\n\
{link}\n\n\
This link expires in 1 hour. If you didn't create an account, you can safely ignore this email.",
        name = ctx.name,
        link = ctx.link,
    );

    Rendered { html, text }
}

fn render_notification(ctx: &TemplateContext) -> Rendered {
    let html = wrap_html(
        "You have a new notification",
        &format!(
            r#"<p>Hi {name},</p>
<p>There's something waiting for you in your account.</p>
<div class="button-container">
    <a href="{link}" class="button">View details</a>
</div>"#,
            name = html_escape(&ctx.name),
            link = ctx.link,
        ),
    );

    let text = format!(
        "Hi {name},\n\n\
There's something waiting for you in your account:\n\
{link}",
        name = ctx.name,
        link = ctx.link,
    );

    Rendered { html, text }
}

/// Shared document shell around a template body.
fn wrap_html(heading: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{heading}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif;
            margin: 0;
            padding: 0;
            background-color: #f5f5f5;
        }}
        .container {{
            max-width: 560px;
            margin: 0 auto;
            padding: 40px 20px;
        }}
        .card {{
            background-color: #ffffff;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0, 0, 0, 0.06);
            overflow: hidden;
        }}
        .header {{
            background: linear-gradient(135deg, #3b82f6 0%, #2563eb 100%);
            color: white;
            padding: 32px 24px;
            text-align: center;
        }}
        .header h1 {{
            margin: 0;
            font-size: 24px;
            font-weight: 600;
        }}
        .content {{
            padding: 32px 24px;
        }}
        .content p {{
            margin: 0 0 16px;
            color: #374151;
            line-height: 1.6;
        }}
        .button-container {{
            text-align: center;
            margin: 32px 0;
        }}
        .button {{
            display: inline-block;
            background: linear-gradient(135deg, #3b82f6 0%, #2563eb 100%);
            color: white !important;
            text-decoration: none;
            padding: 14px 32px;
            border-radius: 6px;
            font-weight: 500;
            font-size: 16px;
        }}
        .note {{
            color: #6b7280;
            font-size: 13px;
            text-align: center;
            margin-top: 24px;
        }}
    </style>
</head>
<body>
    <div class="container">
        <div class="card">
            <div class="header">
                <h1>{heading}</h1>
            </div>
            <div class="content">
{body}
            </div>
        </div>
    </div>
</body>
</html>"#,
        heading = html_escape(heading),
        body = body,
    )
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        TemplateContext {
            name: "Jane Doe".to_string(),
            link: "https://example.com/verify/u1/abc123".to_string(),
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("Tom & Jerry"), "Tom &amp; Jerry");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
    }

    #[test]
    fn test_render_verify_email() {
        let rendered = render("verifyEmail", &ctx()).unwrap();
        assert!(rendered.html.contains("Jane Doe"));
        assert!(rendered.html.contains("https://example.com/verify/u1/abc123"));
        assert!(rendered.html.contains("<!DOCTYPE html>"));
        assert!(rendered.text.contains("Jane Doe"));
        assert!(rendered.text.contains("https://example.com/verify/u1/abc123"));
    }

    #[test]
    fn test_render_notification() {
        let rendered = render("notification", &ctx()).unwrap();
        assert!(rendered.html.contains("Jane Doe"));
        assert!(rendered.text.contains("https://example.com/verify/u1/abc123"));
    }

    #[test]
    fn test_unknown_template() {
        assert!(render("doesNotExist", &ctx()).is_none());
    }

    #[test]
    fn test_name_is_escaped_in_html() {
        let rendered = render(
            "verifyEmail",
            &TemplateContext {
                name: "<b>evil</b>".to_string(),
                link: "https://example.com".to_string(),
            },
        )
        .unwrap();
        assert!(!rendered.html.contains("<b>evil</b>"));
        assert!(rendered.html.contains("&lt;b&gt;evil&lt;/b&gt;"));
    }
}
