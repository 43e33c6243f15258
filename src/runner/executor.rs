use crate::assertion::{StageResult, evaluate, transport_failure};
use crate::http::{Client, CookieJar, Method, Transport};
use crate::runner::types::{SequenceResult, StageReport};
use crate::variable::{CaptureStore, StageOptions, StageResolver};
use crate::{ProbeError, Result};
use std::time::Duration;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// 多阶段检查执行器
///
/// 按顺序执行各阶段：解析占位符、发出请求、求值、累计耗时、保存捕获，
/// 遇到失败且该阶段开启 fail-fast 时停止。
pub struct SequenceRunner<T = Client> {
    transport: T,
}

impl SequenceRunner<Client> {
    pub fn new() -> Self {
        Self {
            transport: Client::new(),
        }
    }
}

impl Default for SequenceRunner<Client> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> SequenceRunner<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 单次检查：不使用捕获、Referer 和 Cookie 存储
    pub async fn run_single(&self, stage: &StageOptions) -> StageResult {
        let jar = CookieJar::disabled();
        let (report, _) = self
            .run_stage(0, stage, &CaptureStore::new(), None, &jar)
            .await;
        report.result
    }

    /// 执行整个阶段序列
    pub async fn run(&self, stages: &[StageOptions], cookie_jar: bool) -> Result<SequenceResult> {
        if stages.is_empty() {
            return Err(ProbeError::config("no stages to run"));
        }

        let span = info_span!("sequence", run_id = %Uuid::new_v4(), stages = stages.len());
        self.run_sequence(stages, cookie_jar).instrument(span).await
    }

    async fn run_sequence(&self, stages: &[StageOptions], cookie_jar: bool) -> Result<SequenceResult> {
        // Cookie 存储只存活于本次运行
        let jar = CookieJar::new(cookie_jar);
        let mut captures = CaptureStore::new();
        let mut previous_url: Option<String> = None;
        let mut total = Duration::ZERO;
        let mut reports: Vec<StageReport> = Vec::with_capacity(stages.len());

        for (index, stage) in stages.iter().enumerate() {
            let (mut report, effective_url) = self
                .run_stage(index, stage, &captures, previous_url.as_deref(), &jar)
                .await;

            total += report.result.elapsed;
            report.cumulative = total;

            if effective_url.is_some() {
                previous_url = effective_url;
            }

            info!(
                stage = index,
                code = report.result.code.as_i32(),
                elapsed = report.result.elapsed.as_secs_f64(),
                total = total.as_secs_f64(),
                "{}",
                report.result.status
            );

            let halted = !report.is_success() && stage.fail_at_error;
            if report.is_success() {
                if let Some(ref capture) = report.result.capture {
                    captures.insert(index, capture.clone());
                }
            } else if halted {
                warn!(stage = index, "stage failed, halting sequence");
            } else {
                warn!(stage = index, "stage failed, continuing (failaterror disabled)");
            }

            reports.push(report);
            if halted {
                break;
            }
        }

        // reports 至少包含第一个阶段
        let last = reports
            .last()
            .cloned()
            .ok_or_else(|| ProbeError::Other("sequence produced no result".to_string()))?;

        Ok(SequenceResult {
            stage: last.index,
            result: last.result,
            total_elapsed: total,
            url: last.url,
            test: stages[last.index].test.to_string(),
            total_stages: stages.len(),
            stages: reports,
        })
    }

    /// 执行单个阶段，返回执行记录和跟随重定向后的 URL
    async fn run_stage(
        &self,
        index: usize,
        stage: &StageOptions,
        captures: &CaptureStore,
        previous_url: Option<&str>,
        jar: &CookieJar,
    ) -> (StageReport, Option<String>) {
        let method = if stage.post_fields.is_some() {
            Method::Post
        } else {
            Method::Get
        };

        let request = match StageResolver::resolve(stage, captures, previous_url) {
            Ok(request) => request,
            Err(e) => {
                warn!(stage = index, error = %e, "failed to resolve stage");
                let report = StageReport {
                    index,
                    method,
                    url: stage.url.clone(),
                    result: StageResult::failure(e.to_string(), Duration::ZERO),
                    cumulative: Duration::ZERO,
                };
                return (report, None);
            }
        };

        debug!(stage = index, method = %request.method, url = %request.url, "performing request");

        let (result, effective_url) = match self.transport.perform(&request, jar).await {
            Ok(outcome) => (evaluate(&stage.test, &outcome), Some(outcome.effective_url)),
            Err(e) => {
                warn!(stage = index, error = %e, "request failed");
                (transport_failure(&e), None)
            }
        };

        let report = StageReport {
            index,
            method: request.method,
            url: request.url,
            result,
            cumulative: Duration::ZERO,
        };
        (report, effective_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{ResultCode, parse_test};
    use crate::http::{Outcome, ResolvedRequest, TransportError};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;

    enum Reply {
        Http(u16, &'static str, u64),
        Fail(&'static str, u64),
    }

    /// 按顺序返回预设响应，并记录收到的请求
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<ResolvedRequest>>,
        jar_enabled: Mutex<Vec<bool>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                jar_enabled: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ResolvedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn perform(
            &self,
            request: &ResolvedRequest,
            cookies: &CookieJar,
        ) -> impl Future<Output = std::result::Result<Outcome, TransportError>> + Send {
            self.requests.lock().unwrap().push(request.clone());
            self.jar_enabled.lock().unwrap().push(cookies.is_enabled());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");
            let result = match reply {
                Reply::Http(status, body, millis) => Ok(Outcome::new(
                    request.url.clone(),
                    format!("{}#effective", request.url),
                    status,
                    body,
                    Duration::from_millis(millis),
                )),
                Reply::Fail(message, millis) => {
                    Err(TransportError::new(message, Duration::from_millis(millis)))
                }
            };
            std::future::ready(result)
        }
    }

    fn stage(url: &str, test: &str) -> StageOptions {
        StageOptions::new(url).with_test(parse_test(test).unwrap())
    }

    #[tokio::test]
    async fn test_all_code_stages_pass() {
        let transport = ScriptedTransport::new(vec![
            Reply::Http(200, "", 100),
            Reply::Http(200, "", 250),
            Reply::Http(200, "", 50),
        ]);
        let runner = SequenceRunner::with_transport(transport);
        let stages = vec![
            stage("http://a/", "code:200"),
            stage("http://b/", "code:200"),
            stage("http://c/", "code:200"),
        ];

        let result = runner.run(&stages, false).await.unwrap();

        assert!(result.is_success());
        assert!(result.is_completed());
        assert_eq!(result.stage, 2);
        assert_eq!(result.total_elapsed, Duration::from_millis(400));
        assert_eq!(result.result.elapsed, Duration::from_millis(50));
        assert_eq!(result.stages[1].cumulative, Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_fail_fast_halts_at_failing_stage() {
        let transport = ScriptedTransport::new(vec![
            Reply::Http(200, "", 100),
            Reply::Http(500, "", 30),
            Reply::Http(200, "", 10),
        ]);
        let runner = SequenceRunner::with_transport(transport);
        let stages = vec![
            stage("http://a/", "code:200"),
            stage("http://b/", "code:200"),
            stage("http://c/", "code:200"),
        ];

        let result = runner.run(&stages, false).await.unwrap();

        assert_eq!(result.code(), ResultCode::Critical);
        assert_eq!(result.stage, 1);
        assert_eq!(result.url, "http://b/");
        assert_eq!(result.result.status, "http://b/ returned HTTP 500");
        assert_eq!(result.total_elapsed, Duration::from_millis(130));
        assert_eq!(result.stages.len(), 2);
        assert_eq!(runner.transport().requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failaterror_disabled_continues() {
        let transport = ScriptedTransport::new(vec![
            Reply::Http(404, "", 10),
            Reply::Http(200, "", 20),
        ]);
        let runner = SequenceRunner::with_transport(transport);
        let stages = vec![
            stage("http://a/", "code:200").with_fail_at_error(false),
            stage("http://b/", "code:200"),
        ];

        let result = runner.run(&stages, false).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.stage, 1);
        assert_eq!(result.passed(), 1);
        assert_eq!(result.total_elapsed, Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_capture_flows_into_later_stage() {
        let transport = ScriptedTransport::new(vec![
            Reply::Http(200, "<a href=\"/x\">token=abc123</a>", 10),
            Reply::Http(200, "", 10),
        ]);
        let runner = SequenceRunner::with_transport(transport);
        let stages = vec![
            stage("https://example.com/", r"pattern:token=(\w+)"),
            stage("https://example.com/?t=PREV_MATCH_0_1", "code:200"),
        ];

        let result = runner.run(&stages, false).await.unwrap();
        assert!(result.is_success());

        let requests = runner.transport().requests();
        assert_eq!(requests[1].url, "https://example.com/?t=abc123");
        assert_eq!(result.url, "https://example.com/?t=abc123");
    }

    #[tokio::test]
    async fn test_reference_to_code_stage_fails_without_request() {
        let transport = ScriptedTransport::new(vec![Reply::Http(200, "token=abc", 10)]);
        let runner = SequenceRunner::with_transport(transport);
        let stages = vec![
            stage("https://example.com/", "code:200"),
            stage("https://example.com/?t=PREV_MATCH_0_1", "code:200"),
            stage("https://example.com/never", "code:200"),
        ];

        let result = runner.run(&stages, false).await.unwrap();

        assert_eq!(result.code(), ResultCode::Critical);
        assert_eq!(result.stage, 1);
        assert!(result.result.status.starts_with("PREV_MATCH_0_1:"));
        assert_eq!(result.url, "https://example.com/?t=PREV_MATCH_0_1");
        assert_eq!(runner.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_pattern_stores_no_capture() {
        let transport = ScriptedTransport::new(vec![
            Reply::Http(200, "nothing here", 10),
            Reply::Http(200, "", 10),
        ]);
        let runner = SequenceRunner::with_transport(transport);
        let stages = vec![
            stage("https://example.com/", r"pattern:token=(\w+)").with_fail_at_error(false),
            stage("https://example.com/?t=PREV_MATCH_0_1", "code:200"),
        ];

        let result = runner.run(&stages, false).await.unwrap();
        assert_eq!(result.stage, 1);
        assert!(!result.is_success());
        assert_eq!(runner.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_referer_chains_effective_url() {
        let transport = ScriptedTransport::new(vec![
            Reply::Http(200, "", 10),
            Reply::Http(200, "", 10),
        ]);
        let runner = SequenceRunner::with_transport(transport);
        let stages = vec![stage("http://a/", "code:200"), stage("http://b/", "code:200")];

        runner.run(&stages, true).await.unwrap();

        let requests = runner.transport().requests();
        assert_eq!(requests[0].referer, None);
        assert_eq!(requests[1].referer.as_deref(), Some("http://a/#effective"));
        assert_eq!(
            *runner.transport().jar_enabled.lock().unwrap(),
            vec![true, true]
        );
    }

    #[tokio::test]
    async fn test_transport_error_keeps_elapsed() {
        let transport = ScriptedTransport::new(vec![
            Reply::Http(200, "", 40),
            Reply::Fail("connection refused", 5),
        ]);
        let runner = SequenceRunner::with_transport(transport);
        let stages = vec![stage("http://a/", "code:200"), stage("http://b/", "code:200")];

        let result = runner.run(&stages, false).await.unwrap();
        assert_eq!(result.code(), ResultCode::Critical);
        assert_eq!(result.result.status, "connection refused");
        assert_eq!(result.total_elapsed, Duration::from_millis(45));
    }

    #[tokio::test]
    async fn test_run_single() {
        let transport = ScriptedTransport::new(vec![Reply::Http(404, "", 10)]);
        let runner = SequenceRunner::with_transport(transport);

        let result = runner.run_single(&stage("http://x/", "code:200")).await;
        assert_eq!(result.code, ResultCode::Critical);
        assert_eq!(result.status, "http://x/ returned HTTP 404");
        assert_eq!(*runner.transport().jar_enabled.lock().unwrap(), vec![false]);
    }

    #[tokio::test]
    async fn test_empty_sequence_is_config_error() {
        let runner = SequenceRunner::with_transport(ScriptedTransport::new(vec![]));
        let err = runner.run(&[], false).await.unwrap_err();
        assert!(err.is_config());
    }
}
