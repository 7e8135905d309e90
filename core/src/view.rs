use crate::image::Image;
use crate::lint::{LintReport, LintStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LintFilter {
    #[default]
    All,
    Missing,
    Short,
    Long,
    Ok,
    Duplicates,
}

impl LintFilter {
    pub fn next(self) -> Self {
        match self {
            LintFilter::All => LintFilter::Missing,
            LintFilter::Missing => LintFilter::Short,
            LintFilter::Short => LintFilter::Long,
            LintFilter::Long => LintFilter::Ok,
            LintFilter::Ok => LintFilter::Duplicates,
            LintFilter::Duplicates => LintFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LintFilter::All => "all",
            LintFilter::Missing => "missing",
            LintFilter::Short => "short",
            LintFilter::Long => "long",
            LintFilter::Ok => "ok",
            LintFilter::Duplicates => "duplicates",
        }
    }

    fn matches(self, image: &Image, report: &LintReport) -> bool {
        let status = report.lint(&image.id).status;
        match self {
            LintFilter::All => true,
            LintFilter::Missing => status == LintStatus::Missing,
            LintFilter::Short => status == LintStatus::Short,
            LintFilter::Long => status == LintStatus::Long,
            LintFilter::Ok => status == LintStatus::Ok,
            LintFilter::Duplicates => report.is_duplicate(&image.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Order as returned by the server.
    #[default]
    Server,
    Newest,
    Oldest,
    AltLength,
    Score,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::Server => SortMode::Newest,
            SortMode::Newest => SortMode::Oldest,
            SortMode::Oldest => SortMode::AltLength,
            SortMode::AltLength => SortMode::Score,
            SortMode::Score => SortMode::Server,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Server => "server",
            SortMode::Newest => "newest",
            SortMode::Oldest => "oldest",
            SortMode::AltLength => "alt length",
            SortMode::Score => "score",
        }
    }
}

pub fn visible_images<'a>(
    images: &'a [Image],
    report: &LintReport,
    filter: LintFilter,
    sort: SortMode,
) -> Vec<&'a Image> {
    let mut visible: Vec<&Image> = images
        .iter()
        .filter(|image| filter.matches(image, report))
        .collect();

    // Images without a timestamp or score sink to the end.
    match sort {
        SortMode::Server => {}
        SortMode::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortMode::Oldest => visible.sort_by_key(|image| (image.created_at.is_none(), image.created_at)),
        SortMode::AltLength => visible.sort_by_key(|image| image.alt().trim().chars().count()),
        SortMode::Score => visible.sort_by(|a, b| {
            let a = a.score.unwrap_or(f64::NEG_INFINITY);
            let b = b.score.unwrap_or(f64::NEG_INFINITY);
            b.total_cmp(&a)
        }),
    }
    visible
}
