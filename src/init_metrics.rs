pub(super) fn init_metrics() {
    describe_toplevel();
    describe_pipeline();
    describe_process();
    describe_repo();
    describe_object_storage();
}

fn describe_toplevel() {
    metrics::describe_counter!(FILES, "How many files have been uploaded to tubely");
}

pub(crate) const FILES: &str = "tubely.files";

fn describe_pipeline() {
    metrics::describe_counter!(
        PIPELINE_STAGE,
        "How many times each video ingestion stage has been entered"
    );
    metrics::describe_counter!(
        PIPELINE_FAILED,
        "How many video uploads have failed, labelled by the stage they failed in"
    );
    metrics::describe_counter!(
        PIPELINE_DONE,
        "How many video uploads have completed every ingestion stage"
    );
    metrics::describe_histogram!(
        PIPELINE_STAGE_DURATION,
        "Timings for each stage of video ingestion"
    );
    metrics::describe_counter!(
        PIPELINE_ORPHANED_BLOB,
        "How many uploaded objects are no longer referenced because the record update failed"
    );
}

pub(crate) const PIPELINE_STAGE: &str = "tubely.pipeline.stage";
pub(crate) const PIPELINE_FAILED: &str = "tubely.pipeline.failed";
pub(crate) const PIPELINE_DONE: &str = "tubely.pipeline.done";
pub(crate) const PIPELINE_STAGE_DURATION: &str = "tubely.pipeline.stage.duration";
pub(crate) const PIPELINE_ORPHANED_BLOB: &str = "tubely.pipeline.orphaned-blob";

fn describe_process() {
    metrics::describe_counter!(
        PROCESS_START,
        "How many external processes have been spawned"
    );
    metrics::describe_histogram!(
        PROCESS_DURATION,
        "Timings for external processes, labelled by command"
    );
    metrics::describe_counter!(PROCESS_END, "How many external processes have exited");
}

pub(crate) const PROCESS_START: &str = "tubely.process.start";
pub(crate) const PROCESS_DURATION: &str = "tubely.process.duration";
pub(crate) const PROCESS_END: &str = "tubely.process.end";

fn describe_repo() {
    metrics::describe_histogram!(
        SLED_VIDEO_READ,
        "Timings for reading video records from sled"
    );
    metrics::describe_histogram!(
        SLED_VIDEO_WRITE,
        "Timings for writing video records to sled"
    );
}

pub(crate) const SLED_VIDEO_READ: &str = "tubely.sled.video.read";
pub(crate) const SLED_VIDEO_WRITE: &str = "tubely.sled.video.write";

fn describe_object_storage() {
    metrics::describe_histogram!(
        OBJECT_STORAGE_PUT_OBJECT_REQUEST,
        "Timings for uploading an object to object storage"
    );
    metrics::describe_counter!(
        OBJECT_STORAGE_PRESIGN,
        "How many signed URLs have been generated"
    );
}

pub(crate) const OBJECT_STORAGE_PUT_OBJECT_REQUEST: &str =
    "tubely.object-storage.put-object-request";
pub(crate) const OBJECT_STORAGE_PRESIGN: &str = "tubely.object-storage.presign";
