use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::display::DisplaySnapshot;
use crate::registry::ChannelSummary;

const STATUS_CSS: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }

body {
    background: #1a1a2e;
    color: #e0e0e0;
    font-family: -apple-system, 'Segoe UI', Roboto, sans-serif;
    min-height: 100vh;
    display: flex;
    flex-direction: column;
    align-items: center;
    padding: 40px 20px;
}

header h1 {
    font-size: 16px;
    font-weight: 500;
    color: #8888aa;
    text-transform: uppercase;
    letter-spacing: 2px;
    margin-bottom: 40px;
}

.display {
    background: #16213e;
    border: 1px solid #0f3460;
    border-radius: 12px;
    padding: 60px 80px;
    text-align: center;
    margin-bottom: 40px;
}

.display h2 {
    font-size: 42px;
    font-weight: 600;
    color: #ffffff;
}

.display .updated {
    margin-top: 16px;
    font-size: 13px;
    color: #8888aa;
}

.channels {
    width: 100%;
    max-width: 560px;
}

.channels h3 {
    font-size: 14px;
    font-weight: 500;
    color: #8888aa;
    margin-bottom: 12px;
}

.channels table {
    width: 100%;
    border-collapse: collapse;
    font-size: 13px;
}

.channels th, .channels td {
    text-align: left;
    padding: 8px 12px;
    border-bottom: 1px solid #0f3460;
}

.channels th { color: #8888aa; font-weight: 500; }
.channels td { font-family: 'SF Mono', Consolas, monospace; }

.empty { color: #666688; font-size: 13px; font-style: italic; }
"#;

const STATUS_JS: &str = r#"
async function refreshDisplay() {
    try {
        const res = await fetch('/api/display');
        if (!res.ok) return;
        const data = await res.json();
        document.getElementById('title').textContent = data.title;
        document.getElementById('open-count').textContent = data.open_channels;
        const updated = document.getElementById('updated');
        if (data.updated_at) {
            updated.textContent = 'Updated ' + new Date(data.updated_at).toLocaleTimeString();
        }
    } catch (err) {
        console.error('Failed to refresh display:', err);
    }
}

setInterval(refreshDisplay, 2000);
"#;

/// Render the receiver status page: the displayed title plus open channels.
pub fn status_page(
    application_name: &str,
    display: &DisplaySnapshot,
    channels: &[ChannelSummary],
) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (application_name) }
                style { (PreEscaped(STATUS_CSS)) }
            }
            body {
                header {
                    h1 { (application_name) }
                }
                section class="display" {
                    h2 id="title" { (display.title) }
                    @if let Some(ts) = display.updated_at {
                        p id="updated" class="updated" { "Updated " (ts.format("%H:%M:%S UTC")) }
                    } @else {
                        p id="updated" class="updated" { "Waiting for a sender" }
                    }
                }
                section class="channels" {
                    h3 { "Open channels (" span id="open-count" { (channels.len()) } ")" }
                    @if channels.is_empty() {
                        p class="empty" { "No senders connected." }
                    } @else {
                        table {
                            tr {
                                th { "Channel" }
                                th { "Opened" }
                            }
                            @for channel in channels {
                                tr {
                                    td { (channel.id) }
                                    td { (channel.opened_at.format("%H:%M:%S UTC")) }
                                }
                            }
                        }
                    }
                }
                script { (PreEscaped(STATUS_JS)) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(title: &str) -> DisplaySnapshot {
        DisplaySnapshot {
            title: title.to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn test_status_page_shows_title_and_name() {
        let page = status_page("Cast Receiver", &snapshot("Ready"), &[]).into_string();
        assert!(page.contains("Cast Receiver"));
        assert!(page.contains("Ready"));
        assert!(page.contains("No senders connected."));
    }

    #[test]
    fn test_status_page_escapes_sender_titles() {
        // Titles arrive from the wire, so markup in them must render inert.
        let page = status_page("Cast Receiver", &snapshot("<script>alert(1)</script>"), &[])
            .into_string();
        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_status_page_lists_channels() {
        let channels = vec![ChannelSummary {
            id: "chan-1".to_string(),
            opened_at: chrono::Utc::now(),
        }];
        let page = status_page("Cast Receiver", &snapshot("Ready"), &channels).into_string();
        assert!(page.contains("chan-1"));
        assert!(!page.contains("No senders connected."));
    }
}
