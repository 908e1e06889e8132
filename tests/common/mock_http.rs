// 每个集成测试文件只使用 MockHttp 的部分方法，dead_code 为预期行为
#![allow(dead_code)]

//! 测试专用 MockHttp
//!
//! 实现 HttpClient trait，预置响应队列（VecDeque），
//! 每次 post_json / get_json 调用从队列头部弹出一个响应，并记录请求。
//!
//! - 队列空时返回 Err，便于检测意外的额外网络调用
//! - `MockHttp::fail(..)` 入队一个传输层错误

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use qingpush::error::ChannelError;
use qingpush::http::HttpClient;

/// 一次被记录的请求
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub params: Vec<(String, String)>,
}

impl Recorded {
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_str(self.body.as_deref().unwrap_or("null")).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// 按队列顺序返回预设响应的 HTTP 客户端
#[derive(Default)]
pub struct MockHttp {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockHttp {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 追加一个成功响应
    pub fn push(&self, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(body.to_string()));
    }

    /// 追加一个传输层错误
    pub fn fail(&self, msg: &str) {
        self.responses.lock().unwrap().push_back(Err(msg.to_string()));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// URL 包含给定片段的请求数
    pub fn count_matching(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    fn next(&self, recorded: Recorded) -> Result<String, ChannelError> {
        self.requests.lock().unwrap().push(recorded);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(body)) => Ok(body),
            Some(Err(msg)) => Err(ChannelError::Transport(msg)),
            None => Err(ChannelError::Transport(
                "MockHttp: 响应队列已空".to_string(),
            )),
        }
    }
}

fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, ChannelError> {
        self.next(Recorded {
            method: "POST",
            url: url.to_string(),
            headers: owned(headers),
            body: Some(body.to_string()),
            params: Vec::new(),
        })
    }

    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<String, ChannelError> {
        self.next(Recorded {
            method: "GET",
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
            params: owned(params),
        })
    }
}
