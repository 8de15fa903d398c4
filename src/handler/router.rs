use async_std::io::Write;

use rawhttp::{Request, ResponseWriter};

use crate::handler::HandlerError;
use crate::handler::responses;
use crate::handler::static_files;
use crate::handler::stream;

pub async fn route<W>(w: &mut ResponseWriter<W>, req: &Request) -> Result<(), HandlerError>
where
    W: Write + Unpin,
{
    let target = req.target();
    match target {
        "/yourproblem" => responses::bad_request(w).await,
        "/myproblem" => responses::internal_server_error(w).await,
        _ if target.starts_with("/video") => static_files::video(w).await,
        _ if target.starts_with("/stream/") => stream::serve(w, &target["/stream/".len()..]).await,
        _ => responses::ok(w).await,
    }
}
