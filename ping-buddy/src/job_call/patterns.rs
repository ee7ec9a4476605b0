use regex::Regex;

use crate::error::ProtocolError;

use super::JobHandle;

/// Fragments the service embeds into its HTML answer. Any template change on the service side
/// surfaces as [ProtocolError::ResponseParse], no guessing.
#[derive(Debug)]
pub struct ResponsePatterns {
    rejection: Regex,
    stream_url: Regex,
    task_id: Regex,
}

impl ResponsePatterns {
    pub fn compile() -> Self {
        Self {
            rejection: Regex::new(r#"err_tip_more\("<li>(.*?)</li>"\)"#)
                .expect("Unable to compile rejection regex"),
            stream_url: Regex::new(r"var wss_url='([^']*)';")
                .expect("Unable to compile stream URL regex"),
            task_id: Regex::new(r"var task_id='([^']*)';")
                .expect("Unable to compile task id regex"),
        }
    }

    /// A rejection takes precedence, even if the body also carries a stream URL and task id.
    pub fn parse(&self, body: &str) -> Result<JobHandle, ProtocolError> {
        if let Some(message) = first_group(&self.rejection, body) {
            return Err(ProtocolError::ServiceRejected {
                message: message.to_string(),
            });
        }
        let stream_url = first_group(&self.stream_url, body)
            .ok_or(ProtocolError::ResponseParse { field: "wss_url" })?;
        let task_id = first_group(&self.task_id, body)
            .ok_or(ProtocolError::ResponseParse { field: "task_id" })?;
        Ok(JobHandle {
            stream_url: stream_url.to_string(),
            task_id: task_id.to_string(),
        })
    }
}

fn first_group<'body>(re: &Regex, body: &'body str) -> Option<&'body str> {
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|it| it.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<JobHandle, ProtocolError> {
        ResponsePatterns::compile().parse(body)
    }

    #[test]
    fn both_assignments_on_one_line() {
        // given
        let body = "var wss_url='X'; var task_id='Y';";
        // when
        let handle = parse(body).expect("handle to be parsed");
        // then
        assert_eq!(
            handle,
            JobHandle {
                stream_url: "X".to_string(),
                task_id: "Y".to_string()
            }
        );
    }

    #[test]
    fn realistic_page() {
        let body = r#"<html><script>
            var wss_url='wss://wss.example.net:8443/batch_ping';
            var task_id='1700000000abcdef';
            check_form();
        </script></html>"#;

        let handle = parse(body).expect("handle to be parsed");

        assert_eq!(handle.stream_url, "wss://wss.example.net:8443/batch_ping");
        assert_eq!(handle.task_id, "1700000000abcdef");
    }

    #[test]
    fn rejection_wins() {
        // given
        let body = r#"err_tip_more("<li>quota exceeded</li>"); var wss_url='X'; var task_id='Y';"#;
        // when
        let result = parse(body);
        // then
        match result {
            Err(ProtocolError::ServiceRejected { message }) => assert_eq!(message, "quota exceeded"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn missing_task_id() {
        let result = parse("var wss_url='X';");
        assert!(matches!(result, Err(ProtocolError::ResponseParse { field: "task_id" })));
    }

    #[test]
    fn missing_stream_url() {
        let result = parse("var task_id='Y';");
        assert!(matches!(result, Err(ProtocolError::ResponseParse { field: "wss_url" })));
    }

    #[test]
    fn double_quoted_assignment_is_drift() {
        let result = parse(r#"var wss_url="X"; var task_id="Y";"#);
        assert!(matches!(result, Err(ProtocolError::ResponseParse { .. })));
    }
}
