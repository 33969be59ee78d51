mod test_rtc_offer_answer;
