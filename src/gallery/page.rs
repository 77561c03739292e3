//! HTML page for the image gallery.

use super::{display_name, format_size, GalleryEntry};

/// Escape HTML special characters to prevent XSS attacks.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

fn render_item(entry: &GalleryEntry) -> String {
    let descriptor = &entry.descriptor;
    let name = html_escape(display_name(&descriptor.filename));
    let title = html_escape(&descriptor.filename);

    let visual = match entry.data_uri {
        Some(ref uri) => format!(
            r#"<img src="{}" alt="{}" loading="lazy">"#,
            html_escape(uri),
            name
        ),
        None => r#"<div class="placeholder">Failed to load image</div>"#.to_string(),
    };

    // Converted to the viewer's locale by the script at the end of the page
    let modified = match descriptor.last_modified {
        Some(ts) => {
            let iso = ts.to_rfc3339();
            format!(r#"<time datetime="{iso}">{iso}</time>"#)
        }
        None => "unknown".to_string(),
    };

    format!(
        r#"        <figure class="gallery-item">
            {visual}
            <figcaption>
                <div class="name" title="{title}">{name}</div>
                <div class="meta">{size} &middot; {modified}</div>
            </figcaption>
        </figure>
"#,
        size = format_size(descriptor.size),
    )
}

/// Render the complete gallery document.
pub fn render_gallery_html(entries: &[GalleryEntry]) -> String {
    let items: String = if entries.is_empty() {
        r#"        <p class="empty">No images uploaded yet.</p>
"#
        .to_string()
    } else {
        entries.iter().map(render_item).collect()
    };
    let count = entries.len();

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Image Gallery</title>
    <style>
        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}
        body {{
            background: #0f0f0f;
            color: #fff;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif;
            padding: 24px;
        }}
        header {{
            margin-bottom: 24px;
        }}
        header h1 {{
            font-size: 20px;
            font-weight: 600;
        }}
        header .count {{
            color: rgba(255, 255, 255, 0.6);
            font-size: 13px;
        }}
        .gallery {{
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(220px, 1fr));
            gap: 16px;
        }}
        .gallery-item {{
            background: rgba(255, 255, 255, 0.05);
            border: 1px solid rgba(255, 255, 255, 0.1);
            border-radius: 8px;
            overflow: hidden;
        }}
        .gallery-item img,
        .gallery-item .placeholder {{
            width: 100%;
            height: 180px;
            object-fit: cover;
            display: block;
        }}
        .gallery-item .placeholder {{
            display: flex;
            align-items: center;
            justify-content: center;
            background: rgba(220, 38, 38, 0.15);
            color: #f87171;
            font-size: 13px;
        }}
        figcaption {{
            padding: 10px 12px;
            font-size: 12px;
        }}
        figcaption .name {{
            font-weight: 500;
            word-break: break-all;
            margin-bottom: 4px;
        }}
        figcaption .meta {{
            color: rgba(255, 255, 255, 0.6);
        }}
        .empty {{
            color: rgba(255, 255, 255, 0.5);
        }}
    </style>
</head>
<body>
    <header>
        <h1>Image Gallery</h1>
        <div class="count">{count} image(s)</div>
    </header>
    <main class="gallery">
{items}    </main>
    <script>
        document.querySelectorAll('time[datetime]').forEach(function (el) {{
            var date = new Date(el.getAttribute('datetime'));
            if (!isNaN(date)) {{
                el.textContent = date.toLocaleString();
            }}
        }});
    </script>
</body>
</html>
"##
    )
}
