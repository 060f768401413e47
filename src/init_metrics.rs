pub(super) fn init_metrics() {
    describe_toplevel();
    describe_upload();
    describe_process();
    describe_store();
}

fn describe_toplevel() {
    metrics::describe_counter!(VIDEOS, "How many videos have been uploaded to tubely");
    metrics::describe_counter!(
        VIDEO_ORIENTATION,
        "How many uploaded videos were classified into each orientation"
    );
}

pub(crate) const VIDEOS: &str = "tubely.videos";
pub(crate) const VIDEO_ORIENTATION: &str = "tubely.videos.orientation";

fn describe_upload() {
    metrics::describe_counter!(UPLOAD_START, "How many uploads have been accepted");
    metrics::describe_counter!(
        UPLOAD_END,
        "How many uploads have finished, whether or not they succeeded"
    );
    metrics::describe_histogram!(
        UPLOAD_DURATION,
        "Timings for an upload from staging to the final record update"
    );
    metrics::describe_histogram!(
        UPLOAD_STAGE,
        "Timings for each stage of the upload pipeline"
    );
}

pub(crate) const UPLOAD_START: &str = "tubely.upload.start";
pub(crate) const UPLOAD_END: &str = "tubely.upload.end";
pub(crate) const UPLOAD_DURATION: &str = "tubely.upload.duration";
pub(crate) const UPLOAD_STAGE: &str = "tubely.upload.stage";

fn describe_process() {
    metrics::describe_counter!(
        PROCESS_START,
        "How many times tubely has spawned a background process"
    );
    metrics::describe_histogram!(
        PROCESS_DURATION,
        "Timings for all background processes"
    );
    metrics::describe_counter!(PROCESS_END, "How many background processes have completed");
}

pub(crate) const PROCESS_START: &str = "tubely.process.start";
pub(crate) const PROCESS_DURATION: &str = "tubely.process.duration";
pub(crate) const PROCESS_END: &str = "tubely.process.end";

fn describe_store() {
    metrics::describe_histogram!(
        OBJECT_STORAGE_PUT,
        "Timings for writing an asset to the object store"
    );
    metrics::describe_histogram!(
        OBJECT_STORAGE_HEALTH,
        "Timings for checking that the object store is reachable"
    );
}

pub(crate) const OBJECT_STORAGE_PUT: &str = "tubely.object-storage.put";
pub(crate) const OBJECT_STORAGE_HEALTH: &str = "tubely.object-storage.health";
