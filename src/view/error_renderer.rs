use std::io;
use std::io::ErrorKind;

use ramhorns::Template;

const ERROR_TPL: &str = r##"<div class="blog-error" data-notification="{{id}}">
    <div class="error-content">
        <h3>Error Loading Post</h3>
        <p>{{message}}</p>
        <button class="blog-error-close" data-dismiss="{{id}}">Close</button>
    </div>
</div>"##;

#[derive(ramhorns::Content)]
struct ViewError<'a> {
    id: u64,
    message: &'a str,
}

pub struct ErrorRenderer {
    template: Template<'static>,
}

impl ErrorRenderer {
    pub fn new() -> io::Result<ErrorRenderer> {
        let template = match Template::new(ERROR_TPL) {
            Ok(x) => x,
            Err(e) => {
                return Err(io::Error::new(ErrorKind::InvalidInput, format!("Error parsing error overlay template: {}", e)));
            }
        };

        Ok(ErrorRenderer {
            template,
        })
    }

    pub fn render(&self, id: u64, message: &str) -> String {
        self.template.render(&ViewError { id, message })
    }
}
