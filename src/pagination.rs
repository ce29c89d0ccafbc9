#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageSlot {
    Page(u32),
    Gap,
}

/// Page buttons for a pager: every page up to seven, otherwise the first and
/// last page around a window of `current ± 1`, with gaps where pages are
/// skipped.
pub(crate) fn build_page_numbers(current: u32, total: u32) -> Vec<PageSlot> {
    if total <= 7 {
        return (1..=total).map(PageSlot::Page).collect();
    }

    let current = current.clamp(1, total);
    let mut pages = vec![PageSlot::Page(1)];
    if current > 3 {
        pages.push(PageSlot::Gap);
    }

    let start = current.saturating_sub(1).max(2);
    let end = (current + 1).min(total - 1);
    pages.extend((start..=end).map(PageSlot::Page));

    if current < total - 2 {
        pages.push(PageSlot::Gap);
    }
    pages.push(PageSlot::Page(total));
    pages
}

pub(crate) fn render_page_line(current: u32, total: u32) -> Option<String> {
    if total <= 1 {
        return None;
    }
    let current = current.clamp(1, total);
    let parts: Vec<String> = build_page_numbers(current, total)
        .into_iter()
        .map(|slot| match slot {
            PageSlot::Page(page) if page == current => format!("[{page}]"),
            PageSlot::Page(page) => page.to_string(),
            PageSlot::Gap => "…".to_string(),
        })
        .collect();
    Some(parts.join(" "))
}
