//! Files media into the date based layout.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::fs::FileSystem;
use crate::metadata::{MetadataError, MetadataExtractor};
use crate::naming::{allocate_sequence, layout, DateMatcher};
use crate::process::{Job, JobError, JobFactory};

use super::config::RenameConfig;
use super::error::CheckFailure;
use super::transcode::Transcoder;

/// Where a file is going, decided during check.
#[derive(Debug, Clone)]
struct Plan {
    dir: PathBuf,
    name: String,
    transcode: bool,
}

/// Moves a file to `/YYYY/MM[/DD]/YYYY_MM_DD_HH:MM:SS_NNNN.ext`.
///
/// The capture time comes from the file name when it carries one, otherwise
/// from the embedded metadata.
pub struct RenameJob {
    fs: Arc<dyn FileSystem>,
    filename: PathBuf,
    matcher: Arc<DateMatcher>,
    extractor: Arc<dyn MetadataExtractor>,
    day_dirs: bool,
    transcoder: Option<Transcoder>,
    plan: Option<Plan>,
}

impl RenameJob {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        filename: impl Into<PathBuf>,
        matcher: Arc<DateMatcher>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            fs,
            filename: filename.into(),
            matcher,
            extractor,
            day_dirs: false,
            transcoder: None,
            plan: None,
        }
    }

    /// File into per-day directories.
    pub fn with_day_dirs(mut self, day_dirs: bool) -> Self {
        self.day_dirs = day_dirs;
        self
    }

    /// Transcode videos to mp4 once they are renamed.
    pub fn with_transcoder(mut self, transcoder: Transcoder) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    async fn capture_time(&self) -> Result<NaiveDateTime, JobError> {
        if let Ok(timestamp) = self.matcher.find(&self.filename) {
            return Ok(timestamp);
        }

        let host_path = self.fs.host_path(&self.filename);
        self.extractor
            .capture_date(&host_path)
            .await
            .map_err(|e| match e {
                MetadataError::Unreadable { .. } => JobError::check(CheckFailure::NoExifData),
                MetadataError::NoDate => JobError::check(CheckFailure::NoExifDate),
                other => JobError::unexpected(other),
            })
    }
}

#[async_trait]
impl Job for RenameJob {
    fn name(&self) -> String {
        self.filename.display().to_string()
    }

    async fn check(&mut self) -> Result<(), JobError> {
        match self.fs.stat(&self.filename).await {
            Ok(stat) if stat.is_dir => return Err(JobError::check(CheckFailure::IsDirectory)),
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Err(JobError::check(CheckFailure::Removed)),
            Err(e) => return Err(JobError::unexpected(e)),
        }

        if layout::is_organized(&self.filename) {
            return Err(JobError::check(CheckFailure::AlreadyProcessed));
        }

        let timestamp = self.capture_time().await?;
        let dir = layout::target_dir(&timestamp, self.day_dirs);
        let prefix = layout::name_prefix(&timestamp);
        let sequence = allocate_sequence(self.fs.as_ref(), &dir, &prefix)
            .await
            .map_err(JobError::unexpected)?;
        let name = format!("{}{}", sequence, layout::lowercase_extension(&self.filename));

        let transcode = match &self.transcoder {
            Some(transcoder) => {
                match transcoder
                    .needs_transcode(self.fs.as_ref(), &self.filename)
                    .await
                {
                    Ok(()) => true,
                    Err(e) if e.is_check_failure() => false,
                    Err(e) => return Err(e),
                }
            }
            None => false,
        };

        debug!("{:?} will be renamed to {:?}", self.filename, dir.join(&name));
        self.plan = Some(Plan {
            dir,
            name,
            transcode,
        });
        Ok(())
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        let plan = self
            .plan
            .take()
            .ok_or_else(|| JobError::unexpected("execute called before a successful check"))?;

        self.fs.mkdir_all(&plan.dir).await.map_err(|e| {
            JobError::execute(format!("failed creating directory {:?}", plan.dir), e)
        })?;

        let target = plan.dir.join(&plan.name);
        self.fs.rename(&self.filename, &target).await.map_err(|e| {
            JobError::execute(
                format!("failed to rename {:?} to {:?}", self.filename, target),
                e,
            )
        })?;
        self.filename = target;

        if plan.transcode {
            if let Some(transcoder) = &self.transcoder {
                self.filename = transcoder.run(self.fs.as_ref(), &self.filename).await?;
            }
        }
        Ok(())
    }
}

/// Creates a [`RenameJob`] for every file not already organized.
pub struct RenameFactory {
    matcher: Arc<DateMatcher>,
    extractor: Arc<dyn MetadataExtractor>,
    config: RenameConfig,
    transcoder: Option<Transcoder>,
}

impl RenameFactory {
    pub fn new(
        matcher: Arc<DateMatcher>,
        extractor: Arc<dyn MetadataExtractor>,
        config: RenameConfig,
    ) -> Self {
        Self {
            matcher,
            extractor,
            config,
            transcoder: None,
        }
    }

    /// Converter used when `transcode_videos` is enabled.
    pub fn with_transcoder(mut self, transcoder: Transcoder) -> Self {
        self.transcoder = Some(transcoder);
        self
    }
}

impl JobFactory for RenameFactory {
    fn create(
        &self,
        fs: Arc<dyn FileSystem>,
        filename: &Path,
        _root: &Path,
    ) -> Option<Box<dyn Job>> {
        let mut job = RenameJob::new(fs, filename, self.matcher.clone(), self.extractor.clone())
            .with_day_dirs(self.config.day_dirs);
        if self.config.transcode_videos {
            if let Some(transcoder) = &self.transcoder {
                job = job.with_transcoder(transcoder.clone());
            }
        }
        Some(Box::new(job))
    }

    fn skip_file(&self, path: &Path) -> bool {
        layout::is_organized(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::VideoConstraints;
    use crate::testing::{FailOp, MemoryFileSystem, MockConverter, MockExtractor};
    use chrono::NaiveDate;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    struct Fixture {
        fs: MemoryFileSystem,
        extractor: Arc<MockExtractor>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                fs: MemoryFileSystem::new(),
                extractor: Arc::new(MockExtractor::new()),
            }
        }

        fn job(&self, filename: &str) -> RenameJob {
            RenameJob::new(
                Arc::new(self.fs.clone()),
                filename,
                Arc::new(DateMatcher::new()),
                self.extractor.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_rename_from_filename() {
        let f = Fixture::new();
        f.fs.add_file("/IMG_20130525_125511.JPG", b"jpeg").await;

        let mut job = f.job("/IMG_20130525_125511.JPG");
        job.check().await.unwrap();
        job.execute().await.unwrap();

        assert!(f.fs.exists("/2013/05/2013_05_25_12:55:11_0000.jpg").await);
        assert!(!f.fs.exists("/IMG_20130525_125511.JPG").await);
        assert_eq!(job.name(), "/2013/05/2013_05_25_12:55:11_0000.jpg");
        assert!(f.extractor.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_rename_from_metadata() {
        let f = Fixture::new();
        f.fs.add_file("/holiday/DSC0001.jpg", b"jpeg").await;
        f.extractor
            .set_date("/holiday/DSC0001.jpg", ts(2010, 1, 13, 22, 1, 37))
            .await;

        let mut job = f.job("/holiday/DSC0001.jpg").with_day_dirs(true);
        job.check().await.unwrap();
        job.execute().await.unwrap();

        assert!(f.fs.exists("/2010/01/13/2010_01_13_22:01:37_0000.jpg").await);
    }

    #[tokio::test]
    async fn test_sequence_continues_after_existing() {
        let f = Fixture::new();
        f.fs.add_file("/2013/05/2013_05_25_12:55:11_0000.jpg", b"a").await;
        f.fs.add_file("/IMG_20130525_125511.jpg", b"b").await;

        let mut job = f.job("/IMG_20130525_125511.jpg");
        job.check().await.unwrap();
        job.execute().await.unwrap();

        assert_eq!(
            f.fs.contents("/2013/05/2013_05_25_12:55:11_0001.jpg").await,
            Some(b"b".to_vec())
        );
        assert_eq!(
            f.fs.contents("/2013/05/2013_05_25_12:55:11_0000.jpg").await,
            Some(b"a".to_vec())
        );
    }

    #[tokio::test]
    async fn test_sequence_overflow_is_unexpected() {
        let f = Fixture::new();
        f.fs.add_file("/2013/05/2013_05_25_12:55:11_18446744073709551615.jpg", b"a")
            .await;
        f.fs.add_file("/IMG_20130525_125511.jpg", b"b").await;

        let err = f.job("/IMG_20130525_125511.jpg").check().await.unwrap_err();
        assert!(matches!(err, JobError::Unexpected(_)));
        assert!(f.fs.exists("/IMG_20130525_125511.jpg").await);
    }

    #[tokio::test]
    async fn test_check_failures() {
        let f = Fixture::new();
        f.fs.add_dir("/album").await;
        f.fs.add_file("/2010/01/2010_01_13_22:01:37_0000.jpg", b"a").await;
        f.fs.add_file("/nodate.png", b"png").await;
        f.fs.add_file("/garbage.bin", b"?").await;
        f.extractor.set_unreadable("/garbage.bin").await;

        let cases = [
            ("/gone.jpg", CheckFailure::Removed),
            ("/album", CheckFailure::IsDirectory),
            (
                "/2010/01/2010_01_13_22:01:37_0000.jpg",
                CheckFailure::AlreadyProcessed,
            ),
            ("/nodate.png", CheckFailure::NoExifDate),
            ("/garbage.bin", CheckFailure::NoExifData),
        ];

        for (filename, want) in cases {
            let err = f.job(filename).check().await.unwrap_err();
            assert!(err.is_check_failure(), "{}", filename);
            assert_eq!(err.to_string(), want.to_string(), "{}", filename);
        }
    }

    #[tokio::test]
    async fn test_missing_exiftool_is_unexpected() {
        let f = Fixture::new();
        f.fs.add_file("/DSC0001.jpg", b"jpeg").await;
        f.extractor.set_tool_missing("/DSC0001.jpg").await;

        let err = f.job("/DSC0001.jpg").check().await.unwrap_err();
        assert!(matches!(err, JobError::Unexpected(_)));
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_file() {
        let f = Fixture::new();
        f.fs.add_file("/IMG_20130525_125511.jpg", b"jpeg").await;
        f.fs.fail_on(FailOp::Rename, "/IMG_20130525_125511.jpg").await;

        let mut job = f.job("/IMG_20130525_125511.jpg");
        job.check().await.unwrap();
        let err = job.execute().await.unwrap_err();

        assert_eq!(
            err.stage(),
            Some(
                "failed to rename \"/IMG_20130525_125511.jpg\" to \
                 \"/2013/05/2013_05_25_12:55:11_0000.jpg\""
            )
        );
        assert!(f.fs.exists("/IMG_20130525_125511.jpg").await);
    }

    #[tokio::test]
    async fn test_failed_mkdir_is_labelled() {
        let f = Fixture::new();
        f.fs.add_file("/IMG_20130525_125511.jpg", b"jpeg").await;
        f.fs.fail_on(FailOp::MkdirAll, "/2013/05").await;

        let mut job = f.job("/IMG_20130525_125511.jpg");
        job.check().await.unwrap();
        let err = job.execute().await.unwrap_err();
        assert_eq!(err.stage(), Some("failed creating directory \"/2013/05\""));
    }

    #[tokio::test]
    async fn test_rename_then_transcode_video() {
        let f = Fixture::new();
        f.fs.add_file("/VID_20120625_165820.AVI", b"avi").await;
        f.fs.add_file("/IMG_20120625_165821.jpg", b"jpeg").await;
        let converter = Arc::new(MockConverter::new().with_output_fs(f.fs.clone()));
        let factory = RenameFactory::new(
            Arc::new(DateMatcher::new()),
            f.extractor.clone(),
            RenameConfig::default().with_transcode_videos(true),
        )
        .with_transcoder(Transcoder::new(converter.clone(), VideoConstraints::default()));

        for name in ["/VID_20120625_165820.AVI", "/IMG_20120625_165821.jpg"] {
            let mut job = factory
                .create(Arc::new(f.fs.clone()), Path::new(name), Path::new("/media"))
                .unwrap();
            job.check().await.unwrap();
            job.execute().await.unwrap();
        }

        assert_eq!(
            f.fs.files().await,
            vec![
                PathBuf::from("/2012/06/2012_06_25_16:58:20_0000.mp4"),
                PathBuf::from("/2012/06/2012_06_25_16:58:21_0000.jpg"),
            ]
        );
        assert_eq!(converter.conversion_count().await, 1);
    }

    #[test]
    fn test_factory_skips_organized_files() {
        let factory = RenameFactory::new(
            Arc::new(DateMatcher::new()),
            Arc::new(MockExtractor::new()),
            RenameConfig::default(),
        );
        assert!(factory.skip_file(Path::new("/2010/01/2010_01_13_22:01:37_0000.jpg")));
        assert!(!factory.skip_file(Path::new("/2010/01/IMG_1234.jpg")));
        assert!(!factory.skip_dir(Path::new("/2010")));
    }
}
