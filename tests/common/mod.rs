#![allow(dead_code)]

pub mod modules {
    use std::fs;
    use std::path::{Path, PathBuf};

    use serde_json::json;
    use tempfile::TempDir;

    /// A temporary module root with an activation list next to it.
    pub struct ModuleTree {
        dir: TempDir,
    }

    impl ModuleTree {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("modules")).unwrap();
            Self { dir }
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        pub fn module_root(&self) -> PathBuf {
            self.dir.path().join("modules")
        }

        pub fn ini_path(&self) -> PathBuf {
            self.dir.path().join("system-ini.json")
        }

        /// Write `<folder>/manifest.json`.
        pub fn module(&self, folder: &str, uuid: &str, slug: &str, version: &str, deps: &[&str]) -> &Self {
            let dir = self.module_root().join(folder);
            fs::create_dir_all(&dir).unwrap();
            let manifest = json!({
                "uuid": uuid,
                "slug": slug,
                "version": version,
                "dependencies": deps,
            });
            fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
            self
        }

        /// Write a file relative to the module folder.
        pub fn file(&self, folder: &str, rel: &str, content: &str) -> &Self {
            let path = self.module_root().join(folder).join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
            self
        }

        /// Write `Routes/routes.json` with one GET route per `(path, controller, action)`.
        pub fn get_routes(&self, folder: &str, routes: &[(&str, &str, &str)]) -> &Self {
            let entries: Vec<_> = routes
                .iter()
                .map(|(path, c, a)| json!({"method": "GET", "path": path, "handler": [c, a]}))
                .collect();
            self.file(folder, "Routes/routes.json", &serde_json::to_string(&entries).unwrap())
        }

        pub fn activation_list(&self, essentials: &[&str], active: &[&str]) -> &Self {
            let list = json!({"Modules": {"essentials": essentials, "active": active}});
            fs::write(self.ini_path(), list.to_string()).unwrap();
            self
        }
    }
}

pub mod apps {
    use std::sync::{Arc, Mutex};

    use brrtkit::dispatcher::{HandlerRequest, HandlerResponse, ResponseMode};
    use brrtkit::middleware::MiddlewareRegistry;
    use brrtkit::registry::HandlerRegistry;
    use brrtkit::router::RouteTable;
    use brrtkit::runtime_config::AppConfig;
    use serde_json::json;

    pub fn config(mode: ResponseMode) -> AppConfig {
        AppConfig {
            router_mode: Some(mode),
            ..AppConfig::default()
        }
    }

    /// Handler answering `{"handler": "<controller>@<action>", "args": [...]}`.
    pub fn echo(label: &'static str) -> impl Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync {
        move |req: &HandlerRequest, res: &mut HandlerResponse| {
            res.body = json!({ "handler": label, "args": req.arguments() });
        }
    }

    /// Handlers `C@a` for every pair, each answering with [`echo`].
    pub fn handlers(pairs: &[(&'static str, &'static str, &'static str)]) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        for (controller, action, label) in pairs {
            registry.register(controller, action, echo(*label));
        }
        registry
    }

    /// Guards that record their invocation into `log` and return `verdict`.
    pub fn recording_guard(
        log: &Arc<Mutex<Vec<String>>>,
        name: &'static str,
        verdict: bool,
    ) -> impl Fn(&HandlerRequest, &mut HandlerResponse, &[String]) -> bool + Send + Sync {
        let log = Arc::clone(log);
        move |_: &HandlerRequest, _: &mut HandlerResponse, args: &[String]| {
            let entry = if args.is_empty() {
                name.to_string()
            } else {
                format!("{name}({})", args.join(","))
            };
            log.lock().unwrap().push(entry);
            verdict
        }
    }

    pub fn table(handlers: HandlerRegistry, middleware: MiddlewareRegistry) -> RouteTable {
        RouteTable::new(Arc::new(handlers), Arc::new(middleware))
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {:?}", e),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Status code, headers (lower-cased names) and body of a raw response.
    pub fn parse_response(resp: &str) -> (u16, Vec<(String, String)>, String) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        (status, headers, body.to_string())
    }
}

pub mod test_server {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}
