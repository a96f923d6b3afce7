use serde::Deserialize;

#[derive(Deserialize)]
pub struct LoginRequests {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct OtpSendRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp: String,
}
