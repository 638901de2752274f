use std::io;
use std::sync::Arc;

use may_minihttp::{HttpService, Request, Response};

use super::request::to_incoming;
use super::response::write_handler_response;
use crate::app::Application;

/// `may_minihttp` service feeding every request to the application's dispatcher.
///
/// One clone is created per connection; clones share the application.
#[derive(Clone)]
pub struct AppService {
    pub app: Arc<Application>,
}

impl AppService {
    #[must_use]
    pub fn new(app: Arc<Application>) -> Self {
        Self { app }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let response = self.app.dispatch(to_incoming(req));
        write_handler_response(res, &response);
        Ok(())
    }
}
