//! Extraction of post records from a gallery listing page.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::archive::{AuthorType, PostFields, PostRecord};
use crate::constants::SEMI_ANONYMOUS_MARKER;
use crate::crawler::date;

static ROW: Lazy<Selector> = Lazy::new(|| selector("tr.ub-content"));
static TITLE_CELL: Lazy<Selector> = Lazy::new(|| selector("td.gall_tit"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| selector("td.gall_tit a"));
static COMMENT_COUNT: Lazy<Selector> = Lazy::new(|| selector(".reply_numbox"));
static NUMBER_CELL: Lazy<Selector> = Lazy::new(|| selector("td.gall_num"));
static DATE_CELL: Lazy<Selector> = Lazy::new(|| selector("td.gall_date"));
static WRITER_CELL: Lazy<Selector> = Lazy::new(|| selector("td.gall_writer"));
static VIEWS_CELL: Lazy<Selector> = Lazy::new(|| selector("td.gall_count"));
static LIKES_CELL: Lazy<Selector> = Lazy::new(|| selector("td.gall_recommend"));

const NOTICE_MARKER: &str = "icon_notice";
const COMMENT_COUNT_CLASS: &str = "reply_numbox";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid selector")
}

/// Rows found on one listing page.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Number of listing rows on the page, posts or not.
    pub row_count: usize,
    /// Posts extracted from those rows, in document order.
    pub posts: Vec<PostRecord>,
}

impl ListingPage {
    /// A page without any listing rows marks the end of the board.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

/// Parse a listing document and extract every post row.
///
/// Rows that are not posts (notices, header rows, rows without a usable
/// date) are skipped without affecting the others.
#[must_use]
pub fn parse_listing(html: &str, now: NaiveDateTime, origin: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    let mut page = ListingPage::default();

    for row in document.select(&ROW) {
        page.row_count += 1;
        if let Some(post) = extract(row, now, origin) {
            page.posts.push(post);
        }
    }

    page
}

/// Turn one listing row into a post record, or `None` if it is not a post.
#[must_use]
pub fn extract(row: ElementRef<'_>, now: NaiveDateTime, origin: &Url) -> Option<PostRecord> {
    if row
        .value()
        .attr("data-type")
        .is_some_and(|kind| kind.contains(NOTICE_MARKER))
    {
        return None;
    }

    let link = row.select(&TITLE_LINK).next()?;
    let url = origin.join(link.value().attr("href")?).ok()?;
    let title = text_without(link, COMMENT_COUNT_CLASS);
    let comments = row
        .select(&TITLE_CELL)
        .next()
        .and_then(|cell| cell.select(&COMMENT_COUNT).next())
        .map_or(0, |count| {
            parse_count(cell_text(count).trim_matches(|c: char| c == '[' || c == ']'))
        });

    let post_id = post_id(row)?;

    let date_cell = row.select(&DATE_CELL).next()?;
    let posted_at = date::resolve(
        date_cell.value().attr("title"),
        &cell_text(date_cell),
        now,
    )?;

    let (author, author_ip, author_type) = author(row);

    let fields = PostFields {
        post_id,
        title,
        url: url.to_string(),
        author,
        author_ip,
        author_type,
        views: count_in(row, &VIEWS_CELL),
        likes: count_in(row, &LIKES_CELL),
        comments,
    };

    Some(PostRecord::new(fields, posted_at))
}

/// The row's `data-no`, or the number column when that is purely numeric.
fn post_id(row: ElementRef<'_>) -> Option<String> {
    if let Some(id) = row.value().attr("data-no").filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }

    let number = row.select(&NUMBER_CELL).next().map(cell_text)?;
    if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
        Some(number)
    } else {
        None
    }
}

fn author(row: ElementRef<'_>) -> (String, String, AuthorType) {
    let Some(writer) = row.select(&WRITER_CELL).next() else {
        return (String::new(), String::new(), AuthorType::Unknown);
    };
    let attrs = writer.value();

    let author = attrs
        .attr("data-nick")
        .filter(|nick| !nick.is_empty())
        .map_or_else(|| cell_text(writer), ToString::to_string);
    let author_ip = attrs.attr("data-ip").unwrap_or_default().to_string();

    let author_type = if attrs.attr("data-uid").is_some_and(|uid| !uid.is_empty()) {
        AuthorType::Member
    } else if !author_ip.is_empty() {
        if author.starts_with(SEMI_ANONYMOUS_MARKER) {
            AuthorType::SemiAnonymous
        } else {
            AuthorType::Ip
        }
    } else {
        AuthorType::Unknown
    };

    (author, author_ip, author_type)
}

fn count_in(row: ElementRef<'_>, cell: &Selector) -> u64 {
    row.select(cell)
        .next()
        .map_or(0, |el| parse_count(&cell_text(el)))
}

/// Non-numeric counters (`-`, blanks) count as zero.
fn parse_count(text: &str) -> u64 {
    text.trim().parse().unwrap_or(0)
}

fn cell_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of `root`, leaving out anything inside a descendant with `class`.
fn text_without(root: ElementRef<'_>, class: &str) -> String {
    let mut text = String::new();

    for node in root.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root.id())
            .filter_map(ElementRef::wrap)
            .any(|el| el.value().classes().any(|c| c == class));
        if !hidden {
            text.push_str(fragment);
        }
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    fn origin() -> Url {
        Url::parse("https://gall.dcinside.com").unwrap()
    }

    fn table(rows: &str) -> String {
        format!("<html><body><table><tbody>{rows}</tbody></table></body></html>")
    }

    const MEMBER_ROW: &str = r#"
        <tr class="ub-content us-post" data-no="1001" data-type="icon_txt">
          <td class="gall_num">1001</td>
          <td class="gall_tit ub-word">
            <a href="/mgallery/board/view/?id=thesingularity&amp;no=1001&amp;page=1">
              <em class="icon_img icon_txt"></em>Scaling laws are back
              <span class="reply_numbox">[12]</span>
            </a>
          </td>
          <td class="gall_writer ub-writer" data-nick="researcher" data-uid="res_01" data-ip="">
            <span class="nickname">researcher</span>
          </td>
          <td class="gall_date" title="2024-03-10 14:05:33">14:05</td>
          <td class="gall_count">345</td>
          <td class="gall_recommend">7</td>
        </tr>"#;

    fn single(row: &str) -> Option<PostRecord> {
        let page = parse_listing(&table(row), now(), &origin());
        assert_eq!(page.row_count, 1);
        page.posts.into_iter().next()
    }

    #[test]
    fn test_extract_member_post() {
        let post = single(MEMBER_ROW).expect("row should be a post");

        assert_eq!(post.post_id, "1001");
        assert_eq!(post.title, "Scaling laws are back");
        assert_eq!(post.comments, 12);
        assert_eq!(
            post.url,
            "https://gall.dcinside.com/mgallery/board/view/?id=thesingularity&no=1001&page=1"
        );
        assert_eq!(post.author, "researcher");
        assert_eq!(post.author_type, AuthorType::Member);
        assert_eq!(post.views, 345);
        assert_eq!(post.likes, 7);
        assert_eq!(post.datetime.to_string(), "2024-03-10 14:05:33");
    }

    #[test]
    fn test_notice_rows_are_skipped() {
        let row = MEMBER_ROW.replace(r#"data-type="icon_txt""#, r#"data-type="icon_notice""#);
        assert!(single(&row).is_none());
    }

    #[test]
    fn test_row_without_title_link() {
        let row = r#"
            <tr class="ub-content" data-no="5">
              <td class="gall_tit">no link</td>
              <td class="gall_date" title="2024-03-10 10:00:00">10:00</td>
            </tr>"#;
        assert!(single(row).is_none());
    }

    #[test]
    fn test_ip_and_semi_anonymous_authors() {
        let ip_row = r#"
            <tr class="ub-content" data-no="2002">
              <td class="gall_tit"><a href="/view/2002">hello</a></td>
              <td class="gall_writer" data-nick="지나가던사람" data-ip="118.235">지나가던사람</td>
              <td class="gall_date" title="2024-03-10 09:00:00">09:00</td>
            </tr>"#;
        let post = single(ip_row).unwrap();
        assert_eq!(post.author_type, AuthorType::Ip);
        assert_eq!(post.author_ip, "118.235");

        let semi_row = ip_row.replace("지나가던사람", "ㅇㅇ");
        let post = single(&semi_row).unwrap();
        assert_eq!(post.author, "ㅇㅇ");
        assert_eq!(post.author_type, AuthorType::SemiAnonymous);
    }

    #[test]
    fn test_author_falls_back_to_cell_text() {
        let row = r#"
            <tr class="ub-content" data-no="3">
              <td class="gall_tit"><a href="/view/3">t</a></td>
              <td class="gall_writer"> <span>someone</span> </td>
              <td class="gall_date" title="2024-03-10 09:00:00">09:00</td>
            </tr>"#;
        let post = single(row).unwrap();
        assert_eq!(post.author, "someone");
        assert_eq!(post.author_type, AuthorType::Unknown);
    }

    #[test]
    fn test_id_falls_back_to_number_column() {
        let row = r#"
            <tr class="ub-content">
              <td class="gall_num">4321</td>
              <td class="gall_tit"><a href="/view/4321">t</a></td>
              <td class="gall_date">03.09</td>
            </tr>"#;
        let post = single(row).unwrap();
        assert_eq!(post.post_id, "4321");
        assert_eq!(post.datetime.to_string(), "2024-03-09 00:00:00");

        let header = row.replace("4321</td>", "번호</td>");
        assert!(single(&header).is_none());
    }

    #[test]
    fn test_unresolvable_date_rejects_row() {
        let row = MEMBER_ROW
            .replace(r#" title="2024-03-10 14:05:33""#, "")
            .replace(">14:05<", ">soon<");
        assert!(single(&row).is_none());
    }

    #[test]
    fn test_bad_counters_default_to_zero() {
        let row = MEMBER_ROW
            .replace(">345<", ">-<")
            .replace(">7<", "><")
            .replace("[12]", "[3/1]");
        let post = single(&row).unwrap();
        assert_eq!(post.views, 0);
        assert_eq!(post.likes, 0);
        assert_eq!(post.comments, 0);
        assert_eq!(post.title, "Scaling laws are back");
    }

    #[test]
    fn test_bad_row_does_not_hide_others() {
        let html = table(&format!(
            r#"{MEMBER_ROW}
            <tr class="ub-content"><td class="gall_num">-</td></tr>
            {}"#,
            MEMBER_ROW.replace("1001", "1000")
        ));
        let page = parse_listing(&html, now(), &origin());
        assert_eq!(page.row_count, 3);
        let ids: Vec<&str> = page.posts.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, vec!["1001", "1000"]);
    }

    #[test]
    fn test_page_without_rows() {
        let page = parse_listing("<html><body><p>nothing</p></body></html>", now(), &origin());
        assert!(page.is_empty());
    }
}
